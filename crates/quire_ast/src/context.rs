//! Source context attached to nodes.

use std::sync::Arc;

use quire_lexer::Token;
use serde::Serialize;

/// Where a node came from: the token that created it and the template path.
///
/// Contexts are only used for diagnostics and source maps. Nodes share them
/// through [`Arc`], so cloning a subtree keeps pointing at the same origin
/// unless a transform rebinds it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Context {
    /// Head of the originating token, without nested tokens.
    pub token: Option<Token>,
    /// Logical path of the template.
    pub path: Option<String>,
}

impl Context {
    /// Creates a shared context.
    pub fn new(token: Option<Token>, path: Option<String>) -> Arc<Self> {
        Arc::new(Self { token, path })
    }

    /// Creates a context from a token, dropping its children.
    pub fn from_token(token: &Token, path: Option<&str>) -> Arc<Self> {
        let head = Token {
            kind: token.kind,
            offset: token.offset,
            content: token.content.clone(),
            grammar: token.grammar,
            tokens: Vec::new(),
        };
        Self::new(Some(head), path.map(str::to_string))
    }

    /// Byte offset of the originating token.
    pub fn offset(&self) -> Option<usize> {
        self.token.as_ref().and_then(|t| t.offset)
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl Serialize for Context {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Context", 2)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("offset", &self.offset())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_lexer::TokenKind;

    #[test]
    fn test_from_token_drops_children() {
        let mut token = Token::new(TokenKind(2), Some(4), "<");
        token.tokens.push(Token::new(TokenKind::RAW, Some(5), "x"));

        let ctx = Context::from_token(&token, Some("home"));
        assert_eq!(ctx.offset(), Some(4));
        assert_eq!(ctx.path(), Some("home"));
        assert!(ctx.token.as_ref().is_some_and(|t| t.tokens.is_empty()));
    }

    #[test]
    fn test_serialize() {
        let ctx = Context::from_token(&Token::new(TokenKind::RAW, Some(7), "x"), Some("a/b"));
        let json = serde_json::to_value(&*ctx).unwrap();
        assert_eq!(json, serde_json::json!({"path": "a/b", "offset": 7}));
    }
}
