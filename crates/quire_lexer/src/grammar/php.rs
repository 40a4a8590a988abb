//! Host language blocks: `<?php ... ?>` and `<?= ... ?>`.

use crate::buffer::Buffer;
use crate::error::ScannerError;
use crate::grammar::{Grammar, pack_token};
use crate::token::{Byte, GrammarId, Item, Token, TokenKind};

/// Captures PHP blocks as single opaque tokens.
///
/// The emitted `CODE` token holds the full block text and carries `OPEN`,
/// `BODY` and `CLOSE` children. Strings and comments are skipped while looking
/// for `?>`; a block without `?>` runs to the end of the template.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpGrammar;

impl PhpGrammar {
    pub const ID: GrammarId = GrammarId::new("php");

    pub const CODE: TokenKind = TokenKind(1);
    pub const OPEN: TokenKind = TokenKind(2);
    pub const BODY: TokenKind = TokenKind(3);
    pub const CLOSE: TokenKind = TokenKind(4);

    /// Length of the opener starting at `<`, if one follows.
    fn open_sequence(src: &mut Buffer<'_>) -> Option<usize> {
        let ahead: Vec<char> = src.lookahead_byte(5).chars().collect();
        let word: String = ahead.iter().take(4).collect();
        if word.eq_ignore_ascii_case("?php") && ahead.get(4).is_none_or(|ch| ch.is_whitespace()) {
            return Some("<?php".len());
        }
        ahead.starts_with(&['?', '=']).then_some("<?=".len())
    }

    fn scan_block(
        &self,
        src: &mut Buffer<'_>,
        lt: Byte,
        open_len: usize,
    ) -> Result<Token, ScannerError> {
        // keep the opener as written, `<?PHP` stays upper case
        let mut open = String::from(lt.ch);
        for _ in 1..open_len {
            if let Some(ch) = src.next().and_then(|item| item.as_char()) {
                open.push(ch);
            }
        }

        let mut code = Token::new(Self::CODE, Some(lt.offset), open.clone()).with_grammar(Self::ID);
        code.tokens
            .push(Token::new(Self::OPEN, Some(lt.offset), open).with_grammar(Self::ID));

        let mut body: Vec<Item> = Vec::new();
        let mut close = None;

        while let Some(item) = src.next() {
            let byte = match item {
                Item::Byte(byte) => byte,
                token => {
                    body.push(token);
                    continue;
                }
            };

            match byte.ch {
                '?' if src.lookahead_byte(1) == ">" => {
                    src.next();
                    close = Some(Token::new(Self::CLOSE, Some(byte.offset), "?>").with_grammar(Self::ID));
                    break;
                }
                '\'' | '"' | '`' => {
                    body.push(Item::Byte(byte));
                    skip_string(src, byte, &mut body)?;
                }
                '/' if src.lookahead_byte(1) == "*" => {
                    body.push(Item::Byte(byte));
                    skip_block_comment(src, byte, &mut body)?;
                }
                '#' => {
                    body.push(Item::Byte(byte));
                    skip_line_comment(src, &mut body);
                }
                '/' if src.lookahead_byte(1) == "/" => {
                    body.push(Item::Byte(byte));
                    skip_line_comment(src, &mut body);
                }
                _ => body.push(Item::Byte(byte)),
            }
        }

        if !body.is_empty() {
            let body = pack_token(body, Self::BODY, Self::ID);
            code.content.push_str(&body.content);
            code.tokens.push(body);
        }
        if let Some(close) = close {
            code.content.push_str(&close.content);
            code.tokens.push(close);
        }

        Ok(code)
    }
}

impl Grammar for PhpGrammar {
    fn id(&self) -> GrammarId {
        Self::ID
    }

    fn parse(&self, src: &mut Buffer<'_>) -> Result<Vec<Item>, ScannerError> {
        let mut out = Vec::new();

        while let Some(item) = src.next() {
            let lt = match item {
                Item::Byte(byte) if byte.ch == '<' => byte,
                other => {
                    out.push(other);
                    continue;
                }
            };

            match Self::open_sequence(src) {
                Some(open) => out.push(Item::Token(self.scan_block(src, lt, open)?)),
                None => out.push(Item::Byte(lt)),
            }
        }

        Ok(out)
    }

    fn token_name(&self, kind: TokenKind) -> &'static str {
        match kind {
            Self::CODE => "PHP:CODE",
            Self::OPEN => "PHP:OPEN_TAG",
            Self::BODY => "PHP:BODY",
            Self::CLOSE => "PHP:CLOSE_TAG",
            _ => "PHP:UNDEFINED",
        }
    }
}

fn skip_string(src: &mut Buffer<'_>, quote: Byte, body: &mut Vec<Item>) -> Result<(), ScannerError> {
    while let Some(item) = src.next() {
        let ch = item.as_char();
        body.push(item);
        match ch {
            Some('\\') => body.extend(src.next()),
            Some(ch) if ch == quote.ch => return Ok(()),
            _ => {}
        }
    }

    Err(ScannerError::new(
        "Unterminated string literal in PHP block",
        quote.offset,
    ))
}

fn skip_block_comment(
    src: &mut Buffer<'_>,
    slash: Byte,
    body: &mut Vec<Item>,
) -> Result<(), ScannerError> {
    body.extend(src.next());
    while let Some(item) = src.next() {
        let star = item.is_char('*');
        body.push(item);
        if star && src.lookahead_byte(1) == "/" {
            body.extend(src.next());
            return Ok(());
        }
    }

    Err(ScannerError::new(
        "Unterminated comment in PHP block",
        slash.offset,
    ))
}

/// Line comments end at a newline or right before `?>`.
fn skip_line_comment(src: &mut Buffer<'_>, body: &mut Vec<Item>) {
    loop {
        if src.lookahead_byte(2) == "?>" {
            return;
        }
        let Some(item) = src.next() else {
            return;
        };
        let newline = item.is_char('\n');
        body.push(item);
        if newline {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Lexer;
    use pretty_assertions::assert_eq;

    fn lex(source: &str) -> Result<Vec<Token>, ScannerError> {
        Lexer::new().with_grammar(PhpGrammar).parse(source)
    }

    fn children(token: &Token) -> Vec<(TokenKind, &str)> {
        token
            .tokens
            .iter()
            .map(|t| (t.kind, t.content.as_str()))
            .collect()
    }

    #[test]
    fn test_block() {
        let tokens = lex("a<?php echo 1; ?>b").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, PhpGrammar::CODE);
        assert_eq!(tokens[1].offset, Some(1));
        assert_eq!(tokens[1].content, "<?php echo 1; ?>");
        assert_eq!(
            children(&tokens[1]),
            vec![
                (PhpGrammar::OPEN, "<?php"),
                (PhpGrammar::BODY, " echo 1; "),
                (PhpGrammar::CLOSE, "?>"),
            ]
        );
        assert_eq!(tokens[2].content, "b");
    }

    #[test]
    fn test_opener_case_is_preserved() {
        let tokens = lex("<?PHP echo 1; ?>").unwrap();
        assert_eq!(tokens[0].content, "<?PHP echo 1; ?>");
        assert_eq!(children(&tokens[0])[0], (PhpGrammar::OPEN, "<?PHP"));
    }

    #[test]
    fn test_short_echo() {
        let tokens = lex("<?='red'?>").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].content, "<?='red'?>");
    }

    #[test]
    fn test_close_inside_string_is_skipped() {
        let tokens = lex("<?php echo \"?>\" . '\\'?>'; ?>x").unwrap();
        assert_eq!(tokens[0].content, "<?php echo \"?>\" . '\\'?>'; ?>");
        assert_eq!(tokens[1].content, "x");
    }

    #[test]
    fn test_line_comment_ends_before_close() {
        let tokens = lex("<?php // note ?>x").unwrap();
        assert_eq!(tokens[0].content, "<?php // note ?>");
        assert_eq!(tokens[1].content, "x");
    }

    #[test]
    fn test_missing_close_runs_to_end() {
        let tokens = lex("<?php echo 1;").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].tokens.len(), 2);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = lex("ab<?php echo 'open").unwrap_err();
        assert_eq!(err.offset, 13);
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        let err = lex("<?php /* open").unwrap_err();
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn test_not_php() {
        let tokens = lex("<?xml version=\"1.0\"?><?phpx").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::RAW);
    }
}
