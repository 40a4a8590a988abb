//! Visitor protocol for rewriting template trees.
//!
//! # Overview
//!
//! - [`Visitor`] - `enter_node`/`leave_node` hooks
//! - [`Signal`] - result of `enter_node`, controls descent
//! - [`Leave`] - result of `leave_node`, keeps, replaces or removes the node
//! - [`Traverser`] - depth-first walker running several visitors in order
//! - [`VisitorContext`] - ancestor frames of the node being visited
//!
//! Rewriting is functional: `leave_node` receives the node by value after its
//! children were processed and returns what should take its place. The
//! traverser rebuilds every child list from those results.
//!
//! # Example
//!
//! ```rust
//! use std::convert::Infallible;
//!
//! use quire_ast::{Node, Raw};
//! use quire_ast::visitor::{Leave, Traverser, Visitor, VisitorContext};
//!
//! struct Shout;
//!
//! impl Visitor for Shout {
//!     type Error = Infallible;
//!
//!     fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, Infallible> {
//!         Ok(match node {
//!             Node::Raw(mut raw) => {
//!                 raw.content = raw.content.to_uppercase();
//!                 Leave::Keep(raw.into())
//!             }
//!             other => Leave::Keep(other),
//!         })
//!     }
//! }
//!
//! let mut shout = Shout;
//! let nodes = Traverser::new()
//!     .with_visitor(&mut shout)
//!     .traverse(vec![Raw::new("hello", None).into()])
//!     .unwrap();
//!
//! assert!(matches!(&nodes[0], Node::Raw(raw) if raw.content == "HELLO"));
//! ```

mod context;
mod traverse;

pub use context::{Frame, VisitorContext};
pub use traverse::Traverser;

use crate::node::Node;

/// Returned by [`Visitor::enter_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    /// Descend into children.
    #[default]
    Continue,
    /// Do not descend; `leave_node` is still called.
    SkipChildren,
    /// Drop the node immediately; no visitor sees it again.
    RemoveNode,
}

/// Returned by [`Visitor::leave_node`].
#[derive(Debug, Clone, PartialEq)]
pub enum Leave {
    /// Keep the given node in place of the visited one.
    Keep(Node),
    /// Remove the node from its parent.
    Remove,
}

impl From<Node> for Leave {
    fn from(node: Node) -> Self {
        Leave::Keep(node)
    }
}

/// Tree rewriting hooks.
pub trait Visitor {
    type Error;

    /// Called before the children of `node` are visited.
    fn enter_node(&mut self, node: &mut Node, ctx: &VisitorContext) -> Result<Signal, Self::Error> {
        let _ = (node, ctx);
        Ok(Signal::Continue)
    }

    /// Called after the children of `node` were visited.
    fn leave_node(&mut self, node: Node, ctx: &mut VisitorContext) -> Result<Leave, Self::Error> {
        let _ = ctx;
        Ok(Leave::Keep(node))
    }
}
