use std::mem::take;

use crate::node::{Meta, Node, NodeKind, Value};

use super::{Frame, Leave, Signal, Visitor, VisitorContext};

/// Depth-first walker.
///
/// For every node, `enter_node` runs on each visitor in registration order,
/// then the children are walked (unless a visitor asked to skip them), then
/// `leave_node` runs on each visitor in the same order, each one receiving the
/// node returned by the previous one.
pub struct Traverser<'v, E> {
    visitors: Vec<&'v mut dyn Visitor<Error = E>>,
}

impl<E> Default for Traverser<'_, E> {
    fn default() -> Self {
        Self {
            visitors: Vec::new(),
        }
    }
}

impl<'v, E> Traverser<'v, E> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_visitor(mut self, visitor: &'v mut dyn Visitor<Error = E>) -> Self {
        self.add_visitor(visitor);
        self
    }

    pub fn add_visitor(&mut self, visitor: &'v mut dyn Visitor<Error = E>) {
        self.visitors.push(visitor);
    }

    /// Walks a list of sibling nodes and returns the rebuilt list.
    pub fn traverse(&mut self, nodes: Vec<Node>) -> Result<Vec<Node>, E> {
        let mut ctx = VisitorContext::default();
        self.traverse_in(nodes, &mut ctx)
    }

    /// Walks `nodes` below the ancestors already recorded in `ctx`.
    pub fn traverse_in(&mut self, nodes: Vec<Node>, ctx: &mut VisitorContext) -> Result<Vec<Node>, E> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(node) = self.visit(node, ctx)? {
                out.push(node);
            }
        }
        Ok(out)
    }

    fn visit(&mut self, mut node: Node, ctx: &mut VisitorContext) -> Result<Option<Node>, E> {
        let mut descend = true;
        for visitor in self.visitors.iter_mut() {
            match visitor.enter_node(&mut node, ctx)? {
                Signal::Continue => {}
                Signal::SkipChildren => descend = false,
                Signal::RemoveNode => return Ok(None),
            }
        }

        if descend {
            node = self.descend(node, ctx)?;
        }

        for visitor in self.visitors.iter_mut() {
            match visitor.leave_node(node, ctx)? {
                Leave::Keep(next) => node = next,
                Leave::Remove => return Ok(None),
            }
        }

        Ok(Some(node))
    }

    fn descend(&mut self, node: Node, ctx: &mut VisitorContext) -> Result<Node, E> {
        let node = match node {
            Node::Template(mut template) => {
                let frame = Frame::new(NodeKind::Template, None, template.context.clone())
                    .with_attributes(take(&mut template.attributes));
                let nodes = take(&mut template.nodes);
                let (nodes, attributes) = self.scoped(ctx, frame, |t, ctx| t.traverse_in(nodes, ctx))?;
                template.nodes = nodes;
                template.attributes = attributes;
                Node::Template(template)
            }
            Node::Tag(mut tag) => {
                let frame = Frame::new(NodeKind::Tag, Some(tag.name.clone()), tag.context.clone())
                    .with_attributes(take(&mut tag.attributes));
                let attrs = take(&mut tag.attrs);
                let nodes = take(&mut tag.nodes);
                let ((attrs, nodes), attributes) = self.scoped(ctx, frame, |t, ctx| {
                    Ok((t.traverse_in(attrs, ctx)?, t.traverse_in(nodes, ctx)?))
                })?;
                tag.attrs = attrs;
                tag.nodes = nodes;
                tag.attributes = attributes;
                Node::Tag(tag)
            }
            Node::Attr(attr) => {
                let frame = Frame::new(
                    NodeKind::Attr,
                    attr.name.as_text().map(str::to_string),
                    attr.context.clone(),
                );
                let (attr, _) = self.scoped(ctx, frame, move |t, ctx| {
                    let mut attr = attr;
                    attr.name = match attr.name {
                        // a removed name leaves an empty one behind
                        Value::Node(node) => t
                            .visit(*node, ctx)?
                            .map_or_else(|| Value::Text(String::new()), Value::from),
                        text => text,
                    };
                    attr.value = match attr.value {
                        Some(Value::Node(node)) => t.visit(*node, ctx)?.map(Value::from),
                        other => other,
                    };
                    Ok(attr)
                })?;
                Node::Attr(attr)
            }
            Node::Block(mut block) => {
                let frame = Frame::new(NodeKind::Block, block.name.clone(), block.context.clone());
                block.nodes = self.children(ctx, frame, take(&mut block.nodes))?;
                Node::Block(block)
            }
            Node::Mixin(mut mixin) => {
                let frame = Frame::new(NodeKind::Mixin, None, mixin.context.clone());
                mixin.nodes = self.children(ctx, frame, take(&mut mixin.nodes))?;
                Node::Mixin(mixin)
            }
            Node::Aggregate(mut aggregate) => {
                let frame = Frame::new(NodeKind::Aggregate, None, aggregate.context.clone());
                aggregate.nodes = self.children(ctx, frame, take(&mut aggregate.nodes))?;
                Node::Aggregate(aggregate)
            }
            Node::Hidden(mut hidden) => {
                let frame = Frame::new(NodeKind::Hidden, None, None);
                hidden.nodes = self.children(ctx, frame, take(&mut hidden.nodes))?;
                Node::Hidden(hidden)
            }
            Node::Verbatim(mut verbatim) => {
                let frame = Frame::new(NodeKind::Verbatim, None, verbatim.context.clone());
                verbatim.nodes = self.children(ctx, frame, take(&mut verbatim.nodes))?;
                Node::Verbatim(verbatim)
            }
            leaf @ (Node::Output(_) | Node::Directive(_) | Node::Raw(_) | Node::Php(_)) => leaf,
        };
        Ok(node)
    }

    fn children(
        &mut self,
        ctx: &mut VisitorContext,
        frame: Frame,
        nodes: Vec<Node>,
    ) -> Result<Vec<Node>, E> {
        self.scoped(ctx, frame, |t, ctx| t.traverse_in(nodes, ctx))
            .map(|(nodes, _)| nodes)
    }

    /// Runs `walk` with `frame` pushed, returning the frame's meta slot.
    fn scoped<T>(
        &mut self,
        ctx: &mut VisitorContext,
        frame: Frame,
        walk: impl FnOnce(&mut Self, &mut VisitorContext) -> Result<T, E>,
    ) -> Result<(T, Vec<Meta>), E> {
        ctx.push(frame);
        let result = walk(self, ctx);
        let attributes = ctx.pop().map(Frame::into_attributes).unwrap_or_default();
        result.map(|value| (value, attributes))
    }
}
