//! Grammar layers.
//!
//! Each grammar reads a [`Buffer`] and returns the same stream with the
//! constructs it understands folded into tokens. Anything it does not
//! recognise is passed through untouched for the next layer.

mod dynamic;
mod html;
mod inline;
mod php;
mod raw;

pub use dynamic::DynamicGrammar;
pub use html::HtmlGrammar;
pub use inline::InlineGrammar;
pub use php::PhpGrammar;
pub use raw::RawGrammar;

use crate::buffer::Buffer;
use crate::error::ScannerError;
use crate::token::{GrammarId, Item, Token, TokenKind};

/// A lexer layer.
pub trait Grammar {
    /// Identifier attached to every token the grammar produces.
    fn id(&self) -> GrammarId;

    /// Consumes the buffer and returns the rewritten stream.
    fn parse(&self, src: &mut Buffer<'_>) -> Result<Vec<Item>, ScannerError>;

    /// Human readable token name, for debugging output.
    fn token_name(&self, kind: TokenKind) -> &'static str;
}

/// Allowed characters of tag names, attribute names and directive names.
pub(crate) fn is_keyword_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | ':' | '.')
}

/// Folds a run of items into a single token.
///
/// The token content is the concatenated source text. When the run contains
/// tokens from earlier layers they are kept as children, with the bytes
/// between them grouped into RAW children owned by `grammar`.
pub(crate) fn pack_token(inner: Vec<Item>, kind: TokenKind, grammar: GrammarId) -> Token {
    let offset = inner.first().and_then(Item::offset);
    let mut token = Token::new(kind, offset, String::new()).with_grammar(grammar);

    let nested = inner.iter().any(|item| matches!(item, Item::Token(_)));
    let mut raw: Option<Token> = None;

    for item in inner {
        match item {
            Item::Byte(byte) => {
                token.content.push(byte.ch);
                if nested {
                    raw.get_or_insert_with(|| {
                        Token::new(TokenKind::RAW, Some(byte.offset), String::new())
                            .with_grammar(grammar)
                    })
                    .content
                    .push(byte.ch);
                }
            }
            Item::Token(child) => {
                token.content.push_str(&child.content);
                if let Some(pending) = raw.take() {
                    token.tokens.push(pending);
                }
                token.tokens.push(child);
            }
        }
    }

    if let Some(pending) = raw {
        token.tokens.push(pending);
    }

    token
}
