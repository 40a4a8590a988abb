//! Echo statements and directives.
//!
//! `{{ expr }}` echoes an escaped value, `{!! expr !!}` echoes it raw and
//! `@name(body)` invokes a directive. Prefixing any of them with `@` (or
//! writing `@@`) emits the construct as plain text.
//!
//! `@declare(...)` is consumed by the grammar itself and changes the echo
//! delimiters for the rest of the template:
//!
//! ```text
//! @declare(syntax="off")                 disable echo statements
//! @declare(syntax="default")             restore {{ }} and {!! !!}
//! @declare(open="[[", close="]]")        custom escaped echo
//! @declare(openRaw="[!", closeRaw="!]")  custom raw echo
//! ```

mod braces;
mod directive;

use crate::buffer::Buffer;
use crate::error::ScannerError;
use crate::grammar::Grammar;
use crate::token::{Byte, GrammarId, Item, TokenKind};

use braces::Braces;
use directive::{DirectiveScanner, Scan};

/// Tokenizes echo statements and `@directive(...)` calls.
#[derive(Debug, Clone, Default)]
pub struct DynamicGrammar {
    directives: Option<Vec<String>>,
}

impl DynamicGrammar {
    pub const ID: GrammarId = GrammarId::new("dynamic");

    pub const OPEN_TAG: TokenKind = TokenKind(1);
    pub const CLOSE_TAG: TokenKind = TokenKind(2);
    pub const OPEN_RAW_TAG: TokenKind = TokenKind(3);
    pub const CLOSE_RAW_TAG: TokenKind = TokenKind(4);
    pub const BODY_OPEN: TokenKind = TokenKind(5);
    pub const BODY_CLOSE: TokenKind = TokenKind(6);
    pub const BODY: TokenKind = TokenKind(7);
    pub const DIRECTIVE: TokenKind = TokenKind(8);
    pub const KEYWORD: TokenKind = TokenKind(9);
    pub const WHITESPACE: TokenKind = TokenKind(10);

    /// Grammar control directive.
    pub const DECLARE: &'static str = "declare";

    /// Creates a grammar which treats every `@name` as a directive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a grammar which only recognises the given directive names.
    ///
    /// Any other `@name` is kept as plain text, which leaves room for CSS
    /// at-rules and e-mail addresses in templates.
    pub fn with_directives<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            directives: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    fn is_known(&self, name: &str) -> bool {
        self.directives
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Handles an `@` at `at`. Returns true when the directive was consumed.
    fn directive(
        &self,
        src: &mut Buffer<'_>,
        at: Byte,
        state: &mut [Braces; 2],
        out: &mut Vec<Item>,
    ) -> Result<bool, ScannerError> {
        match DirectiveScanner::default().scan(src, at.offset) {
            Scan::Parsed(directive) => {
                let last = directive.last_offset();
                if directive.keyword().eq_ignore_ascii_case(Self::DECLARE) {
                    if let Some(body) = directive.body() {
                        declare(state, body);
                    }
                } else if self.is_known(directive.keyword()) {
                    out.extend(directive.into_tokens().into_iter().map(Item::Token));
                } else {
                    return Ok(false);
                }
                src.replay(last);
                Ok(true)
            }
            Scan::Unterminated(name) if !name.is_empty() && self.is_known(&name) => {
                Err(ScannerError::new(
                    format!("Unterminated body of directive `@{name}`"),
                    at.offset,
                ))
            }
            _ => Ok(false),
        }
    }
}

impl Grammar for DynamicGrammar {
    fn id(&self) -> GrammarId {
        Self::ID
    }

    fn parse(&self, src: &mut Buffer<'_>) -> Result<Vec<Item>, ScannerError> {
        let mut out = Vec::new();
        let mut state = [
            Braces::new(
                "{{",
                "}}",
                [Self::OPEN_TAG, Self::BODY, Self::CLOSE_TAG],
                Self::ID,
            ),
            Braces::new(
                "{!!",
                "!!}",
                [Self::OPEN_RAW_TAG, Self::BODY, Self::CLOSE_RAW_TAG],
                Self::ID,
            ),
        ];

        while let Some(item) = src.next() {
            let byte = match item {
                Item::Byte(byte) => byte,
                token => {
                    out.push(token);
                    continue;
                }
            };

            if byte.ch == '@' {
                let escaped = state.iter().any(|braces| braces.next_token(src))
                    || src.lookahead_byte(1) == "@";
                if escaped {
                    // hide the escape character
                    out.extend(src.next());
                    continue;
                }

                if self.directive(src, byte, &mut state, &mut out)? {
                    continue;
                }
                src.replay(byte.offset);
            }

            if let Some(braces) = state.iter().find(|braces| braces.starts(src, byte)) {
                if let Some(tokens) = braces.scan(src, byte) {
                    out.extend(tokens.into_iter().map(Item::Token));
                    continue;
                }
                src.replay(byte.offset);
            }

            out.push(Item::Byte(byte));
        }

        Ok(out)
    }

    fn token_name(&self, kind: TokenKind) -> &'static str {
        match kind {
            Self::OPEN_TAG => "DYNAMIC:OPEN_TAG",
            Self::CLOSE_TAG => "DYNAMIC:CLOSE_TAG",
            Self::OPEN_RAW_TAG => "DYNAMIC:OPEN_RAW_TAG",
            Self::CLOSE_RAW_TAG => "DYNAMIC:CLOSE_RAW_TAG",
            Self::BODY_OPEN => "DYNAMIC:BODY_OPEN",
            Self::BODY_CLOSE => "DYNAMIC:BODY_CLOSE",
            Self::BODY => "DYNAMIC:BODY",
            Self::DIRECTIVE => "DYNAMIC:DIRECTIVE",
            Self::KEYWORD => "DYNAMIC:KEYWORD",
            Self::WHITESPACE => "DYNAMIC:WHITESPACE",
            _ => "DYNAMIC:UNDEFINED",
        }
    }
}

/// Applies `@declare(...)` options to the echo delimiters.
fn declare([echo, raw]: &mut [Braces; 2], body: &str) {
    for (option, value) in declare_options(body) {
        let value = value.unwrap_or_default();
        match option.as_str() {
            "syntax" => {
                echo.set_active(value != "off");
                raw.set_active(value != "off");
                if value == "default" {
                    echo.set_start("{{");
                    echo.set_end("}}");
                    raw.set_start("{!!");
                    raw.set_end("!!}");
                }
            }
            "open" => echo.set_start(&value),
            "close" => echo.set_end(&value),
            "openRaw" => raw.set_start(&value),
            "closeRaw" => raw.set_end(&value),
            _ => tracing::debug!(option, "ignoring unknown declare option"),
        }
    }
}

/// Splits `key="value", flag` style options, honoring quotes.
pub(crate) fn declare_options(body: &str) -> Vec<(String, Option<String>)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in body.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch == ',' => parts.push(std::mem::take(&mut current)),
            None => current.push(ch),
        }
    }
    parts.push(current);

    let unquote = |s: &str| {
        s.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace())
            .to_string()
    };

    parts
        .iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| match split_option(part) {
            Some((key, value)) => (unquote(key), Some(unquote(value))),
            None => (unquote(part), None),
        })
        .collect()
}

/// Splits at the first `=` outside quotes.
fn split_option(part: &str) -> Option<(&str, &str)> {
    let mut quote: Option<char> = None;
    for (index, ch) in part.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '=' => return Some((&part[..index], &part[index + 1..])),
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Lexer;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn lex_with(grammar: DynamicGrammar, source: &str) -> Vec<(TokenKind, Option<usize>, String)> {
        Lexer::new()
            .with_grammar(grammar)
            .parse(source)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.offset, t.content))
            .collect()
    }

    fn lex(source: &str) -> Vec<(TokenKind, Option<usize>, String)> {
        lex_with(DynamicGrammar::new(), source)
    }

    fn t(kind: TokenKind, offset: usize, content: &str) -> (TokenKind, Option<usize>, String) {
        (kind, Some(offset), content.to_string())
    }

    #[test]
    fn test_echo() {
        assert_eq!(
            lex("{{ $var }}"),
            vec![
                t(DynamicGrammar::OPEN_TAG, 0, "{{"),
                t(DynamicGrammar::BODY, 2, " $var "),
                t(DynamicGrammar::CLOSE_TAG, 8, "}}"),
            ]
        );
    }

    #[test]
    fn test_raw_echo() {
        assert_eq!(
            lex("{!! $var !!}"),
            vec![
                t(DynamicGrammar::OPEN_RAW_TAG, 0, "{!!"),
                t(DynamicGrammar::BODY, 3, " $var "),
                t(DynamicGrammar::CLOSE_RAW_TAG, 9, "!!}"),
            ]
        );
    }

    #[test]
    fn test_echo_with_quoted_braces() {
        assert_eq!(
            lex("{{ $var . \"{{ hello world }}\" }}"),
            vec![
                t(DynamicGrammar::OPEN_TAG, 0, "{{"),
                t(DynamicGrammar::BODY, 2, " $var . \"{{ hello world }}\" "),
                t(DynamicGrammar::CLOSE_TAG, 30, "}}"),
            ]
        );
    }

    #[rstest]
    #[case::escaped_echo("@{{ $var }}", "{{ $var }}")]
    #[case::escaped_raw("@{!! $var !!}", "{!! $var !!}")]
    fn test_escaped_echo(#[case] source: &str, #[case] raw: &str) {
        assert_eq!(lex(source), vec![t(TokenKind::RAW, 1, raw)]);
    }

    #[test]
    fn test_escaped_at() {
        assert_eq!(lex("a@@b"), vec![t(TokenKind::RAW, 0, "a@b")]);
    }

    #[rstest]
    #[case::unterminated("{{ $var }")]
    #[case::empty("{{}}")]
    #[case::single_brace("{ $var }")]
    fn test_invalid_echo_is_raw(#[case] source: &str) {
        assert_eq!(lex(source), vec![t(TokenKind::RAW, 0, source)]);
    }

    #[test]
    fn test_directive_without_body() {
        assert_eq!(
            lex("@do"),
            vec![
                t(DynamicGrammar::DIRECTIVE, 0, "@"),
                t(DynamicGrammar::KEYWORD, 1, "do"),
            ]
        );
    }

    #[test]
    fn test_directive_with_empty_body() {
        assert_eq!(
            lex("@do()"),
            vec![
                t(DynamicGrammar::DIRECTIVE, 0, "@"),
                t(DynamicGrammar::KEYWORD, 1, "do"),
                t(DynamicGrammar::BODY_OPEN, 3, "("),
                t(DynamicGrammar::BODY_CLOSE, 4, ")"),
            ]
        );
    }

    #[test]
    fn test_directive_with_nested_body() {
        assert_eq!(
            lex("@do(a, (b), \")\")x"),
            vec![
                t(DynamicGrammar::DIRECTIVE, 0, "@"),
                t(DynamicGrammar::KEYWORD, 1, "do"),
                t(DynamicGrammar::BODY_OPEN, 3, "("),
                t(DynamicGrammar::BODY, 4, "a, (b), \")\""),
                t(DynamicGrammar::BODY_CLOSE, 15, ")"),
                t(TokenKind::RAW, 16, "x"),
            ]
        );
    }

    #[test]
    fn test_directive_whitespace_before_body() {
        assert_eq!(
            lex("@if ($x) yes"),
            vec![
                t(DynamicGrammar::DIRECTIVE, 0, "@"),
                t(DynamicGrammar::KEYWORD, 1, "if"),
                t(DynamicGrammar::WHITESPACE, 3, " "),
                t(DynamicGrammar::BODY_OPEN, 4, "("),
                t(DynamicGrammar::BODY, 5, "$x"),
                t(DynamicGrammar::BODY_CLOSE, 7, ")"),
                t(TokenKind::RAW, 8, " yes"),
            ]
        );
    }

    #[test]
    fn test_directive_trailing_whitespace_is_content() {
        assert_eq!(
            lex("@else yes"),
            vec![
                t(DynamicGrammar::DIRECTIVE, 0, "@"),
                t(DynamicGrammar::KEYWORD, 1, "else"),
                t(TokenKind::RAW, 5, " yes"),
            ]
        );
    }

    #[test]
    fn test_directive_followed_by_tag() {
        let tokens = lex("@endif<b>");
        assert_eq!(tokens[1], t(DynamicGrammar::KEYWORD, 1, "endif"));
        assert_eq!(tokens[2], t(TokenKind::RAW, 6, "<b>"));
    }

    #[rstest]
    #[case::lone_at("a @ b")]
    #[case::no_name("@(x)")]
    #[case::symbol("@#")]
    fn test_invalid_directive_is_raw(#[case] source: &str) {
        assert_eq!(lex(source), vec![t(TokenKind::RAW, 0, source)]);
    }

    #[test]
    fn test_unterminated_body_is_error() {
        let err = Lexer::new()
            .with_grammar(DynamicGrammar::new())
            .parse("ab @foo(bar")
            .unwrap_err();
        assert_eq!(err.offset, 3);
        assert!(err.message.contains("@foo"));
    }

    #[test]
    fn test_unknown_directive_is_text_when_filtered() {
        let tokens = lex_with(
            DynamicGrammar::with_directives(["if"]),
            "@media (x) @if(1)",
        );
        assert_eq!(
            tokens,
            vec![
                t(TokenKind::RAW, 0, "@media (x) "),
                t(DynamicGrammar::DIRECTIVE, 11, "@"),
                t(DynamicGrammar::KEYWORD, 12, "if"),
                t(DynamicGrammar::BODY_OPEN, 14, "("),
                t(DynamicGrammar::BODY, 15, "1"),
                t(DynamicGrammar::BODY_CLOSE, 16, ")"),
            ]
        );
    }

    #[test]
    fn test_unknown_unterminated_directive_is_text_when_filtered() {
        let tokens = lex_with(DynamicGrammar::with_directives(["if"]), "@media (x");
        assert_eq!(tokens, vec![t(TokenKind::RAW, 0, "@media (x")]);
    }

    #[test]
    fn test_declare_custom_braces() {
        let tokens = lex("@declare(open=\"[[\", close=\"]]\")[[ $x ]]{{ y }}");
        assert_eq!(
            tokens,
            vec![
                t(DynamicGrammar::OPEN_TAG, 31, "[["),
                t(DynamicGrammar::BODY, 33, " $x "),
                t(DynamicGrammar::CLOSE_TAG, 37, "]]"),
                t(TokenKind::RAW, 39, "{{ y }}"),
            ]
        );
    }

    #[test]
    fn test_declare_syntax_off_and_default() {
        let tokens = lex("@declare(syntax=\"off\"){{ a }}@declare(syntax='default'){{ b }}");
        assert_eq!(tokens[0], t(TokenKind::RAW, 22, "{{ a }}"));
        assert_eq!(tokens[1].0, DynamicGrammar::OPEN_TAG);
        assert_eq!(tokens[2].2, " b ");
    }

    #[test]
    fn test_declare_options() {
        assert_eq!(
            declare_options("syntax=\"off\", open='[,', flag"),
            vec![
                ("syntax".to_string(), Some("off".to_string())),
                ("open".to_string(), Some("[,".to_string())),
                ("flag".to_string(), None),
            ]
        );
    }
}
