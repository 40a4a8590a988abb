//! Grammar chain driver.

use tracing::{debug, trace};

use crate::buffer::Buffer;
use crate::error::ScannerError;
use crate::grammar::{Grammar, RawGrammar};
use crate::stream::StringStream;
use crate::token::{GrammarId, Item, Token};

/// Runs template text through an ordered list of grammars.
///
/// Grammars are applied in registration order; each one reads the output of
/// the previous layer. [`RawGrammar`] always runs last.
#[derive(Default)]
pub struct Lexer {
    grammars: Vec<Box<dyn Grammar>>,
}

impl Lexer {
    /// Creates a lexer with no grammars; it only produces RAW tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`Lexer::add_grammar`].
    pub fn with_grammar(mut self, grammar: impl Grammar + 'static) -> Self {
        self.add_grammar(grammar);
        self
    }

    pub fn add_grammar(&mut self, grammar: impl Grammar + 'static) {
        self.grammars.push(Box::new(grammar));
    }

    /// Ids of the registered grammars, in application order.
    pub fn grammars(&self) -> impl Iterator<Item = GrammarId> + '_ {
        self.grammars.iter().map(|g| g.id())
    }

    /// Tokenizes `source`.
    ///
    /// Every returned token carries the id of the grammar that produced it.
    /// Fails with the first [`ScannerError`] raised by any layer.
    pub fn parse(&self, source: &str) -> Result<Vec<Token>, ScannerError> {
        let mut items: Vec<Item> = StringStream::new(source).collect();

        let layers = self
            .grammars
            .iter()
            .map(|g| g.as_ref())
            .chain(std::iter::once(&RawGrammar as &dyn Grammar));

        for grammar in layers {
            let mut buffer = Buffer::new(items);
            items = grammar
                .parse(&mut buffer)?
                .into_iter()
                .map(|item| tag(item, grammar.id()))
                .collect();
            trace!(grammar = %grammar.id(), items = items.len(), "grammar pass done");
        }

        let tokens: Vec<Token> = items
            .into_iter()
            .filter_map(|item| match item {
                Item::Token(token) => Some(token),
                Item::Byte(_) => None,
            })
            .collect();

        debug!("Lexed {} tokens from {} bytes", tokens.len(), source.len());
        Ok(tokens)
    }

    /// Debug name of a token, resolved through the grammar that produced it.
    pub fn token_name(&self, token: &Token) -> &'static str {
        let Some(id) = token.grammar else {
            return "UNDEFINED";
        };
        if id == GrammarId::RAW {
            return RawGrammar.token_name(token.kind);
        }
        self.grammars
            .iter()
            .find(|g| g.id() == id)
            .map_or("UNDEFINED", |g| g.token_name(token.kind))
    }
}

impl std::fmt::Debug for Lexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.grammars()).finish()
    }
}

/// Attaches `grammar` to a token that has not been claimed yet.
fn tag(item: Item, grammar: GrammarId) -> Item {
    match item {
        Item::Token(token) if token.grammar.is_none() => Item::Token(token.with_grammar(grammar)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{DynamicGrammar, HtmlGrammar, InlineGrammar, PhpGrammar};
    use crate::token::TokenKind;
    use pretty_assertions::assert_eq;

    fn full() -> Lexer {
        Lexer::new()
            .with_grammar(PhpGrammar)
            .with_grammar(InlineGrammar)
            .with_grammar(DynamicGrammar::new())
            .with_grammar(HtmlGrammar)
    }

    #[test]
    fn test_empty_source() {
        assert!(full().parse("").unwrap().is_empty());
    }

    #[test]
    fn test_plain_text_is_single_raw_token() {
        let tokens = Lexer::new().parse("hello").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::RAW);
        assert_eq!(tokens[0].grammar, Some(GrammarId::RAW));
        assert_eq!(tokens[0].offset, Some(0));
    }

    #[test]
    fn test_every_token_is_tagged() {
        let tokens = full()
            .parse("<div class=\"a {{ $b }}\">@if($c)${d}<?= $e ?>@endif</div>")
            .unwrap();
        assert!(tokens.iter().all(|t| t.grammar.is_some()));
    }

    #[test]
    fn test_concatenated_content_is_source() {
        let source = "<ul>\n  @foreach($items as $i)\n  <li>{{ $i }}</li>\n  @endforeach\n</ul>";
        let tokens = full().parse(source).unwrap();
        let text: String = tokens.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(text, source);
    }

    #[test]
    fn test_token_names() {
        let lexer = full();
        let tokens = lexer.parse("<b>{{ $x }}</b>").unwrap();
        let names: Vec<_> = tokens.iter().map(|t| lexer.token_name(t)).collect();
        insta::assert_debug_snapshot!(names, @r#"
        [
            "HTML:OPEN_TAG",
            "HTML:KEYWORD",
            "HTML:CLOSE_TAG",
            "DYNAMIC:OPEN_TAG",
            "DYNAMIC:BODY",
            "DYNAMIC:CLOSE_TAG",
            "HTML:OPEN_SHORT_TAG",
            "HTML:KEYWORD",
            "HTML:CLOSE_TAG",
        ]
        "#);
    }

    #[test]
    fn test_scanner_error_stops_lexing() {
        let err = full().parse("<p>@foo(bar</p>").unwrap_err();
        assert_eq!(err.offset, 3);
    }
}
