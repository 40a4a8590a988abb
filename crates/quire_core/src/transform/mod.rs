//! Tree transforms applied between parsing and rendering.
//!
//! A template goes through three stages:
//!
//! 1. **prepare**: marker tags become structural nodes ([`DefineBlocks`],
//!    [`DefineAttributes`], [`DefineHidden`], [`DefineStacks`]).
//! 2. **transform**: imports are resolved and parents extended
//!    ([`ResolveImports`], [`ExtendsParent`]). Both merge through the
//!    [`Merger`].
//! 3. **finalize**: stack pushes are collected ([`StackCollector`]) and,
//!    when configured, whitespace-only text is dropped ([`TrimRaw`]).

mod define;
mod extends;
mod imports;
mod merger;
mod stack;
mod trim;

pub use define::{DefineAttributes, DefineBlocks, DefineHidden, DefineStacks};
pub use extends::ExtendsParent;
pub use imports::{Import, ResolveImports};
pub use merger::{MergeMode, Merger};
pub use stack::{PREPEND_TAG, PUSH_TAG, StackCollector, UNIQUE_ID};
pub use trim::TrimRaw;

use quire_ast::Node;
use quire_ast::visitor::Traverser;

use crate::error::CompileError;

/// Runs the prepare stage.
pub fn prepare(nodes: Vec<Node>) -> Result<Vec<Node>, CompileError> {
    let mut blocks = DefineBlocks;
    let mut attributes = DefineAttributes;
    let mut hidden = DefineHidden;
    let mut stacks = DefineStacks;

    Traverser::new()
        .with_visitor(&mut blocks)
        .with_visitor(&mut attributes)
        .with_visitor(&mut hidden)
        .with_visitor(&mut stacks)
        .traverse(nodes)
}

/// Runs the finalize stage.
pub fn finalize(nodes: Vec<Node>, trim_whitespace: bool) -> Result<Vec<Node>, CompileError> {
    let nodes = StackCollector.collect(nodes)?;
    if !trim_whitespace {
        return Ok(nodes);
    }

    let mut trim = TrimRaw;
    Traverser::new().with_visitor(&mut trim).traverse(nodes)
}
