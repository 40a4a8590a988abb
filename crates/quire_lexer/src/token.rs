//! Lexer items: single characters and grammar tokens.

use std::fmt;

use serde::Serialize;

/// Numeric token type.
///
/// Kinds are scoped to the grammar that produced the token; the same number
/// means different things for different grammars. Only [`TokenKind::RAW`] is
/// shared by every grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TokenKind(pub u16);

impl TokenKind {
    /// Plain content.
    pub const RAW: TokenKind = TokenKind(0);
}

/// Identifies the grammar layer which produced (or first touched) a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GrammarId(&'static str);

impl GrammarId {
    /// Final pass which groups leftover bytes.
    pub const RAW: GrammarId = GrammarId::new("raw");

    /// Creates a grammar id.
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the grammar name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for GrammarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// One source character and its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Byte {
    /// Byte offset of the character in the template source.
    pub offset: usize,
    /// The character itself.
    pub ch: char,
}

impl Byte {
    /// Creates a new byte.
    #[inline]
    pub const fn new(offset: usize, ch: char) -> Self {
        Self { offset, ch }
    }
}

/// A lexeme produced by a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Grammar specific token type.
    pub kind: TokenKind,
    /// Byte offset of the first character, if the token maps to source text.
    pub offset: Option<usize>,
    /// Source text covered by the token, including nested tokens.
    pub content: String,
    /// Grammar which first claimed the token.
    pub grammar: Option<GrammarId>,
    /// Nested tokens, present when the token wraps output of earlier layers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<Token>,
}

impl Token {
    /// Creates a token without a grammar tag.
    pub fn new(kind: TokenKind, offset: Option<usize>, content: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            content: content.into(),
            grammar: None,
            tokens: Vec::new(),
        }
    }

    /// Sets the grammar tag.
    #[must_use]
    pub fn with_grammar(mut self, grammar: GrammarId) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// Offset of the last character covered by the token.
    pub fn last_offset(&self) -> Option<usize> {
        let start = self.offset?;
        let width = self.content.chars().last().map_or(1, char::len_utf8);
        Some((start + self.content.len()).saturating_sub(width))
    }

    /// Offset just past the token.
    pub fn end(&self) -> Option<usize> {
        self.offset.map(|start| start + self.content.len())
    }

    /// Returns true when the token belongs to the given grammar and kind.
    #[inline]
    pub fn is(&self, grammar: GrammarId, kind: TokenKind) -> bool {
        self.grammar == Some(grammar) && self.kind == kind
    }
}

/// Either a raw character or a token; the unit flowing between grammar layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Item {
    Byte(Byte),
    Token(Token),
}

impl Item {
    /// Offset of the item in the template source.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Item::Byte(byte) => Some(byte.offset),
            Item::Token(token) => token.offset,
        }
    }

    /// Returns the character when the item is a byte.
    #[inline]
    pub fn as_char(&self) -> Option<char> {
        match self {
            Item::Byte(byte) => Some(byte.ch),
            Item::Token(_) => None,
        }
    }

    /// Returns true when the item is the given character.
    #[inline]
    pub fn is_char(&self, ch: char) -> bool {
        self.as_char() == Some(ch)
    }

    /// Source text covered by the item.
    pub fn text(&self) -> String {
        match self {
            Item::Byte(byte) => byte.ch.to_string(),
            Item::Token(token) => token.content.clone(),
        }
    }
}

impl From<Byte> for Item {
    fn from(byte: Byte) -> Self {
        Item::Byte(byte)
    }
}

impl From<Token> for Item {
    fn from(token: Token) -> Self {
        Item::Token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_offsets() {
        let token = Token::new(TokenKind(7), Some(11), "\"value\"");
        assert_eq!(token.last_offset(), Some(17));
        assert_eq!(token.end(), Some(18));
    }

    #[test]
    fn test_token_offsets_multibyte() {
        let token = Token::new(TokenKind::RAW, Some(2), "aé");
        assert_eq!(token.end(), Some(5));
        assert_eq!(token.last_offset(), Some(3));
    }

    #[test]
    fn test_token_without_offset() {
        let token = Token::new(TokenKind::RAW, None, "synthetic");
        assert_eq!(token.last_offset(), None);
        assert_eq!(token.end(), None);
    }

    #[test]
    fn test_token_is() {
        let html = GrammarId::new("html");
        let token = Token::new(TokenKind(2), Some(0), "<").with_grammar(html);
        assert!(token.is(html, TokenKind(2)));
        assert!(!token.is(GrammarId::RAW, TokenKind(2)));
        assert!(!token.is(html, TokenKind::RAW));
    }

    #[test]
    fn test_item_helpers() {
        let byte: Item = Byte::new(3, '<').into();
        assert_eq!(byte.offset(), Some(3));
        assert!(byte.is_char('<'));
        assert_eq!(byte.text(), "<");

        let token: Item = Token::new(TokenKind::RAW, Some(4), "abc").into();
        assert_eq!(token.as_char(), None);
        assert_eq!(token.text(), "abc");
    }

    #[test]
    fn test_token_serialization() {
        let token = Token::new(TokenKind(1), Some(1), "tag").with_grammar(GrammarId::new("html"));
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["kind"], 1);
        assert_eq!(json["grammar"], "html");
        assert!(json.get("tokens").is_none());
    }
}
