//! # quire_ast
//!
//! AST types for Quire templates.
//!
//! The parser produces a [`Template`] whose children are [`Node`]s. Every node
//! except [`Hidden`] carries an optional [`Context`] pointing back at the token
//! it was built from, which is what error messages and source maps resolve.
//!
//! Transforms rewrite the tree through the [`visitor`] module.

mod context;
mod node;
mod pattern;
pub mod visitor;

pub use context::Context;
pub use node::{
    Aggregate, Attr, Block, Directive, Hidden, Meta, Mixin, Node, NodeKind, Output, Php, Raw, Tag,
    Template, Value, Verbatim, split_values, unquote,
};
pub use pattern::{Pattern, PatternError};
