//! # quire_lexer
//!
//! Layered lexer for Quire templates.
//!
//! Template text is split into [`Byte`]s and pushed through an ordered chain of
//! [`Grammar`] layers. Every layer reads the previous layer's output through a
//! replayable [`Buffer`] and either passes items along untouched or folds them
//! into [`Token`]s. A final raw pass groups whatever bytes are left into RAW
//! tokens, so the lexer output is a flat token list.
//!
//! ## Example
//!
//! ```rust
//! use quire_lexer::{Lexer, TokenKind};
//! use quire_lexer::grammar::{DynamicGrammar, HtmlGrammar};
//!
//! let lexer = Lexer::new()
//!     .with_grammar(DynamicGrammar::new())
//!     .with_grammar(HtmlGrammar);
//!
//! let tokens = lexer.parse("<b>{{ $name }}</b>").unwrap();
//! assert_eq!(tokens[0].content, "<");
//! assert!(tokens.iter().all(|t| t.grammar.is_some()));
//! assert_ne!(tokens[3].kind, TokenKind::RAW);
//! ```

mod buffer;
mod error;
pub mod grammar;
mod lexer;
mod position;
mod stream;
mod token;

pub use buffer::Buffer;
pub use error::ScannerError;
pub use grammar::Grammar;
pub use lexer::Lexer;
pub use position::Position;
pub use stream::StringStream;
pub use token::{Byte, GrammarId, Item, Token, TokenKind};
