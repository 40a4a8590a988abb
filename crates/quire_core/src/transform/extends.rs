//! Resolves `<extends>` tags.
//!
//! `<extends:layout.base/>` or `<extends path="layout/base"/>` marks the
//! enclosing template or tag as a child of the named parent. Once the
//! enclosing node is fully transformed, its content is merged into the
//! compiled parent: same-named blocks are overridden and the remaining
//! content is appended.

use std::mem::take;

use quire_ast::visitor::{Leave, Signal, Visitor, VisitorContext};
use quire_ast::{Meta, Node, Tag, Template};
use tracing::debug;

use super::merger::{MergeMode, Merger};
use crate::builder::Builder;
use crate::error::CompileError;

const TAG: &str = "extends";

fn is_extends(tag: &Tag) -> bool {
    tag.name == TAG || tag.name.starts_with("extends:")
}

/// Merges templates and tags into the parent they extend.
pub struct ExtendsParent<'b> {
    builder: &'b Builder,
}

impl<'b> ExtendsParent<'b> {
    pub fn new(builder: &'b Builder) -> Self {
        Self { builder }
    }

    /// Path of the parent named by an extends tag.
    fn path(tag: &Tag) -> Result<String, CompileError> {
        if let Some(suffix) = tag.name.strip_prefix("extends:")
            && !suffix.is_empty()
        {
            return Ok(suffix.replace('.', "/"));
        }

        tag.attr_text("path")
            .filter(|path| !path.is_empty())
            .ok_or_else(|| {
                CompileError::extends(
                    "Unable to extend parent without a path",
                    tag.context.clone(),
                    None,
                )
            })
    }

    /// Takes the pending extends tag out of a node's metadata.
    fn pending(attributes: &mut Vec<Meta>) -> Option<Tag> {
        let index = attributes
            .iter()
            .position(|meta| matches!(meta, Meta::Extends(_)))?;
        match attributes.remove(index) {
            Meta::Extends(tag) => Some(*tag),
            Meta::StackLevel(_) => None,
        }
    }

    fn extend(&self, mut parent: Tag, children: Vec<Node>) -> Result<Vec<Node>, CompileError> {
        parent.nodes.extend(children);

        let path = Self::path(&parent)?;
        let template = self.builder.load(&path).map_err(|e| {
            CompileError::extends(
                format!("Unable to extend parent `{path}`"),
                parent.context.clone(),
                Some(e),
            )
        })?;
        debug!(parent = %path, "extending parent");

        Merger::new(MergeMode::Extends).merge(template.nodes, parent)
    }
}

impl Visitor for ExtendsParent<'_> {
    type Error = CompileError;

    fn enter_node(&mut self, node: &mut Node, _ctx: &VisitorContext) -> Result<Signal, CompileError> {
        Ok(match node {
            Node::Tag(tag) if is_extends(tag) => Signal::SkipChildren,
            _ => Signal::Continue,
        })
    }

    fn leave_node(&mut self, node: Node, ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        match node {
            Node::Tag(tag) if is_extends(&tag) => {
                let Some(attributes) = ctx.attributes_mut() else {
                    return Err(CompileError::logic(
                        "Extends must be placed inside a template or tag",
                        tag.context,
                    ));
                };
                if attributes.iter().any(|meta| matches!(meta, Meta::Extends(_))) {
                    return Err(CompileError::logic(
                        "Template may only extend one parent",
                        tag.context,
                    ));
                }
                attributes.push(Meta::Extends(Box::new(tag)));
                Ok(Leave::Remove)
            }
            Node::Template(mut template) => {
                if let Some(parent) = Self::pending(&mut template.attributes) {
                    template.nodes = self.extend(parent, take(&mut template.nodes))?;
                }
                Ok(Node::Template(template).into())
            }
            Node::Tag(mut tag) => match Self::pending(&mut tag.attributes) {
                Some(parent) => {
                    let nodes = self.extend(parent, take(&mut tag.nodes))?;
                    Ok(Node::Template(Template::with_nodes(nodes, tag.context)).into())
                }
                None => Ok(Node::Tag(tag).into()),
            },
            other => Ok(other.into()),
        }
    }
}
