use std::sync::Arc;

use crate::context::Context;
use crate::node::{Meta, NodeKind};

/// An ancestor of the node being visited.
///
/// The ancestor itself is being rebuilt while its children are walked, so
/// frames only expose a summary of it. Templates and tags lend their
/// [`Meta`] slot to the frame; whatever visitors store there is written back
/// to the node before its own `leave_node` runs.
#[derive(Debug, Clone)]
pub struct Frame {
    kind: NodeKind,
    name: Option<String>,
    context: Option<Arc<Context>>,
    attributes: Option<Vec<Meta>>,
}

impl Frame {
    pub(crate) fn new(kind: NodeKind, name: Option<String>, context: Option<Arc<Context>>) -> Self {
        Self {
            kind,
            name,
            context,
            attributes: None,
        }
    }

    pub(crate) fn with_attributes(mut self, attributes: Vec<Meta>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub(crate) fn into_attributes(self) -> Vec<Meta> {
        self.attributes.unwrap_or_default()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Tag name, block name or static attribute name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn context(&self) -> Option<&Arc<Context>> {
        self.context.as_ref()
    }

    pub fn attributes(&self) -> Option<&[Meta]> {
        self.attributes.as_deref()
    }
}

/// Ancestor chain of the node being visited, outermost first.
#[derive(Debug, Default)]
pub struct VisitorContext {
    frames: Vec<Frame>,
}

impl VisitorContext {
    /// Direct parent of the visited node.
    pub fn parent(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Ancestors, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }

    /// Number of ancestors.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Meta slot of the nearest template or tag ancestor.
    pub fn attributes_mut(&mut self) -> Option<&mut Vec<Meta>> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.attributes.as_mut())
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }
}
