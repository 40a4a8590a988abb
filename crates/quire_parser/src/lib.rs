//! # quire_parser
//!
//! Builds Quire template ASTs from lexer tokens.
//!
//! ## Architecture
//!
//! The [`Parser`] runs its [`Lexer`](quire_lexer::Lexer) and hands every token
//! to the [`Syntax`] registered for the token's grammar. Syntaxes emit nodes
//! into an [`Assembler`], which tracks open tags. Tokens that wrap output of
//! other grammars (an attribute value containing `{{ }}`, for example) are
//! parsed recursively into [`Mixin`](quire_ast::Mixin) nodes.
//!
//! ## Example
//!
//! ```rust
//! use quire_ast::Node;
//! use quire_parser::Parser;
//!
//! let template = Parser::default().parse("<b>{{ $name }}</b>", Some("hello")).unwrap();
//!
//! let Node::Tag(tag) = &template.nodes[0] else { panic!() };
//! assert_eq!(tag.name, "b");
//! assert!(matches!(&tag.nodes[0], Node::Output(output) if output.body == " $name "));
//! ```

mod assembler;
mod error;
mod parser;
pub mod syntax;

pub use assembler::Assembler;
pub use error::ParserError;
pub use parser::{Parser, Session};
pub use syntax::Syntax;
