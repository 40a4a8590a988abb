//! Prepare stage: turns marker tags into structural nodes.

use std::mem::take;

use quire_ast::visitor::{Leave, Visitor, VisitorContext};
use quire_ast::{Aggregate, Attr, Block, Hidden, Meta, Node, Pattern, PatternError, Tag, Value};

use crate::error::CompileError;

const BLOCK_PREFIXES: [&str; 4] = ["block:", "define:", "yield:", "section:"];

/// `<block:name>`, `<define:name>`, `<yield:name>`, `<section:name>` and
/// `<block name="name">` become named [`Block`]s.
#[derive(Debug, Default)]
pub struct DefineBlocks;

impl DefineBlocks {
    fn block_name(tag: &Tag) -> Option<String> {
        BLOCK_PREFIXES
            .iter()
            .find_map(|prefix| tag.name.strip_prefix(prefix))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| (tag.name == "block").then(|| tag.attr_text("name")).flatten())
    }
}

impl Visitor for DefineBlocks {
    type Error = CompileError;

    fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        let Node::Tag(tag) = node else {
            return Ok(node.into());
        };

        Ok(match Self::block_name(&tag) {
            Some(name) => Node::from(Block::new(Some(name), tag.nodes, tag.context)).into(),
            None => Node::Tag(tag).into(),
        })
    }
}

/// `attr:aggregate[="pattern"]` becomes an attribute [`Aggregate`].
#[derive(Debug, Default)]
pub struct DefineAttributes;

impl DefineAttributes {
    pub const ATTRIBUTE: &'static str = "attr:aggregate";

    fn aggregate(attr: Attr) -> Result<Aggregate, CompileError> {
        let pattern = match &attr.value {
            None => Pattern::All,
            Some(Value::Text(_)) => attr
                .value_text()
                .unwrap_or_default()
                .parse()
                .map_err(|e: PatternError| {
                    CompileError::syntax(e.to_string(), attr.context.clone())
                })?,
            Some(Value::Node(_)) => {
                return Err(CompileError::syntax(
                    "Aggregate pattern must be static",
                    attr.context.clone(),
                ));
            }
        };
        Ok(Aggregate::new(pattern, attr.context))
    }
}

impl Visitor for DefineAttributes {
    type Error = CompileError;

    fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        let Node::Tag(mut tag) = node else {
            return Ok(node.into());
        };

        tag.attrs = take(&mut tag.attrs)
            .into_iter()
            .map(|node| match node {
                Node::Attr(attr) if attr.name.as_text() == Some(Self::ATTRIBUTE) => {
                    Self::aggregate(attr).map(Node::Aggregate)
                }
                other => Ok(other),
            })
            .collect::<Result<_, _>>()?;

        Ok(Node::Tag(tag).into())
    }
}

/// `<hidden>` content is kept in the tree but never rendered.
#[derive(Debug, Default)]
pub struct DefineHidden;

impl Visitor for DefineHidden {
    type Error = CompileError;

    fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        Ok(match node {
            Node::Tag(tag) if tag.name == "hidden" => Node::from(Hidden { nodes: tag.nodes }).into(),
            other => other.into(),
        })
    }
}

/// `<stack:collect name="x" level="n">` becomes a stack [`Aggregate`]
/// collecting `x` pushes from `n` scopes up.
#[derive(Debug, Default)]
pub struct DefineStacks;

impl DefineStacks {
    pub const TAG: &'static str = "stack:collect";

    fn stack(tag: Tag) -> Result<Aggregate, CompileError> {
        let Some(name) = tag.attr_text("name").filter(|n| !n.is_empty()) else {
            return Err(CompileError::syntax(
                "Stack requires a static `name` attribute",
                tag.context,
            ));
        };

        let level = match tag.attr_text("level") {
            None => 0,
            Some(level) => level.trim().parse::<usize>().map_err(|_| {
                CompileError::syntax(format!("Invalid stack level `{level}`"), tag.context.clone())
            })?,
        };

        let mut aggregate = Aggregate::new(Pattern::Include(vec![name]), tag.context);
        aggregate.nodes = tag.nodes;
        aggregate.attributes.push(Meta::StackLevel(level));
        Ok(aggregate)
    }
}

impl Visitor for DefineStacks {
    type Error = CompileError;

    fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        Ok(match node {
            Node::Tag(tag) if tag.name == Self::TAG => Node::from(Self::stack(tag)?).into(),
            other => other.into(),
        })
    }
}
