//! Parser error types.

use std::sync::Arc;

use quire_ast::Context;
use quire_lexer::{ScannerError, Token, TokenKind};
use thiserror::Error;

/// Errors raised while turning template text into an AST.
#[derive(Debug, Error)]
pub enum ParserError {
    /// The token stream does not form a valid template.
    #[error("{message}")]
    Syntax {
        message: String,
        context: Option<Arc<Context>>,
    },

    /// A grammar layer failed.
    #[error("{source}")]
    Scanner {
        source: ScannerError,
        path: Option<String>,
    },

    /// A token was produced by a grammar without a registered syntax.
    #[error("Undefined token grammar `{grammar}`")]
    UnknownGrammar {
        grammar: String,
        context: Option<Arc<Context>>,
    },
}

impl ParserError {
    /// Creates a syntax error at `context`.
    pub fn syntax(message: impl Into<String>, context: Option<Arc<Context>>) -> Self {
        Self::Syntax {
            message: message.into(),
            context,
        }
    }

    pub fn scanner(source: ScannerError, path: Option<&str>) -> Self {
        Self::Scanner {
            source,
            path: path.map(str::to_string),
        }
    }

    /// Context of the failure point. Scanner errors only know an offset, so
    /// a context is synthesized for them.
    pub fn context(&self) -> Option<Arc<Context>> {
        match self {
            Self::Syntax { context, .. } | Self::UnknownGrammar { context, .. } => context.clone(),
            Self::Scanner { source, path } => {
                let token = Token::new(TokenKind::RAW, Some(source.offset), "");
                Some(Context::new(Some(token), path.clone()))
            }
        }
    }

    /// Byte offset of the failure point, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Scanner { source, .. } => Some(source.offset),
            _ => self.context().and_then(|ctx| ctx.offset()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_context() {
        let err = ParserError::scanner(ScannerError::new("Unterminated body", 12), Some("home"));
        let ctx = err.context().unwrap();
        assert_eq!(ctx.offset(), Some(12));
        assert_eq!(ctx.path(), Some("home"));
        assert_eq!(err.to_string(), "Unterminated body");
    }

    #[test]
    fn test_syntax_offset() {
        let err = ParserError::syntax("Unclosed tag `b`", None);
        assert_eq!(err.offset(), None);
        assert_eq!(err.to_string(), "Unclosed tag `b`");
    }
}
