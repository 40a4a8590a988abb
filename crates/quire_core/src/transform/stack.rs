//! Finalize stage: moves `<stack:push>` and `<stack:prepend>` content into
//! the matching `<stack:collect>` aggregates.
//!
//! Templates and tags open scopes. A stack collected at level `n` is
//! registered `n` scopes above the one it is declared in, and receives the
//! pushes made anywhere inside that scope, before or after the declaration.
//! The nearest matching stack wins. Pushes without a matching stack stay in
//! place so that an importing or extending template can still collect them.
//!
//! Collection runs in three walks over the same tree: stacks are registered,
//! pushes are gathered and removed, then stacks are filled. Stack and push
//! contents are never walked, which keeps scope numbering identical across
//! the walks.

use std::mem::take;

use quire_ast::visitor::{Leave, Signal, Traverser, Visitor, VisitorContext};
use quire_ast::{Node, Pattern, Tag};
use tracing::debug;

use crate::error::CompileError;

pub const PUSH_TAG: &str = "stack:push";
pub const PREPEND_TAG: &str = "stack:prepend";
pub const UNIQUE_ID: &str = "unique-id";

/// Returns `Some(true)` for prepend tags, `Some(false)` for push tags.
pub(crate) fn push_kind(tag: &Tag) -> Option<bool> {
    match tag.name.as_str() {
        PUSH_TAG => Some(false),
        PREPEND_TAG => Some(true),
        _ => None,
    }
}

fn is_stack(node: &Node) -> bool {
    matches!(node, Node::Aggregate(aggregate) if aggregate.is_stack())
}

fn is_sealed(node: &Node) -> bool {
    is_stack(node) || matches!(node, Node::Tag(tag) if push_kind(tag).is_some())
}

/// Pre-order scope numbering shared by the collection walks.
#[derive(Debug, Default)]
struct Scopes {
    open: Vec<usize>,
    next: usize,
}

impl Scopes {
    fn is_scope(node: &Node) -> bool {
        match node {
            Node::Template(_) => true,
            Node::Tag(tag) => push_kind(tag).is_none(),
            _ => false,
        }
    }

    fn enter(&mut self, node: &Node) -> Signal {
        if Self::is_scope(node) {
            self.open.push(self.next);
            self.next += 1;
        }
        if is_sealed(node) {
            Signal::SkipChildren
        } else {
            Signal::Continue
        }
    }

    fn leave(&mut self, node: &Node) {
        if Self::is_scope(node) {
            self.open.pop();
        }
    }
}

#[derive(Debug)]
struct Stack {
    scope: usize,
    pattern: Pattern,
    pushes: Vec<Push>,
}

#[derive(Debug)]
struct Push {
    nodes: Vec<Node>,
    prepend: bool,
    unique_id: Option<String>,
}

struct Register<'s> {
    scopes: Scopes,
    stacks: &'s mut Vec<Stack>,
}

impl Visitor for Register<'_> {
    type Error = CompileError;

    fn enter_node(&mut self, node: &mut Node, _ctx: &VisitorContext) -> Result<Signal, CompileError> {
        if let Node::Aggregate(aggregate) = node
            && aggregate.is_stack()
        {
            let depth = self.scopes.open.len();
            let index = depth.saturating_sub(aggregate.level() + 1);
            let scope = self.scopes.open.get(index).copied().unwrap_or_default();
            self.stacks.push(Stack {
                scope,
                pattern: aggregate.pattern.clone(),
                pushes: Vec::new(),
            });
        }
        Ok(self.scopes.enter(node))
    }

    fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        self.scopes.leave(&node);
        Ok(node.into())
    }
}

struct Gather<'s> {
    scopes: Scopes,
    stacks: &'s mut Vec<Stack>,
}

impl Gather<'_> {
    /// Nearest stack accepting `name`, searching scopes innermost first.
    fn find(&self, name: &str) -> Option<usize> {
        self.scopes.open.iter().rev().find_map(|scope| {
            self.stacks
                .iter()
                .position(|s| s.scope == *scope && s.pattern.accepts(name).is_some())
        })
    }
}

impl Visitor for Gather<'_> {
    type Error = CompileError;

    fn enter_node(&mut self, node: &mut Node, _ctx: &VisitorContext) -> Result<Signal, CompileError> {
        Ok(self.scopes.enter(node))
    }

    fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        self.scopes.leave(&node);

        let Node::Tag(tag) = node else {
            return Ok(node.into());
        };
        let (Some(prepend), Some(name)) = (push_kind(&tag), tag.attr_text("name")) else {
            return Ok(Node::Tag(tag).into());
        };

        match self.find(&name) {
            Some(index) => {
                self.stacks[index].pushes.push(Push {
                    unique_id: tag.attr_text(UNIQUE_ID),
                    nodes: tag.nodes,
                    prepend,
                });
                Ok(Leave::Remove)
            }
            None => {
                debug!(stack = %name, "no stack in scope, keeping push");
                Ok(Node::Tag(tag).into())
            }
        }
    }
}

struct Fill {
    stacks: std::vec::IntoIter<Stack>,
}

impl Visitor for Fill {
    type Error = CompileError;

    fn enter_node(&mut self, node: &mut Node, _ctx: &VisitorContext) -> Result<Signal, CompileError> {
        let Node::Aggregate(aggregate) = node else {
            return Ok(if is_sealed(node) {
                Signal::SkipChildren
            } else {
                Signal::Continue
            });
        };
        if !aggregate.is_stack() {
            return Ok(Signal::Continue);
        }

        let Some(stack) = self.stacks.next() else {
            return Ok(Signal::SkipChildren);
        };

        for push in stack.pushes {
            if let Some(id) = push.unique_id {
                if aggregate.unique_ids.contains(&id) {
                    continue;
                }
                aggregate.unique_ids.push(id);
            }

            if push.prepend {
                let tail = take(&mut aggregate.nodes);
                aggregate.nodes = push.nodes;
                aggregate.nodes.extend(tail);
            } else {
                aggregate.nodes.extend(push.nodes);
            }
        }
        Ok(Signal::SkipChildren)
    }
}

/// Moves pushes into their stacks.
#[derive(Debug, Default)]
pub struct StackCollector;

impl StackCollector {
    pub fn collect(&self, nodes: Vec<Node>) -> Result<Vec<Node>, CompileError> {
        let mut stacks = Vec::new();

        let mut register = Register {
            scopes: Scopes::default(),
            stacks: &mut stacks,
        };
        let nodes = Traverser::new().with_visitor(&mut register).traverse(nodes)?;
        if stacks.is_empty() {
            return Ok(nodes);
        }

        let mut gather = Gather {
            scopes: Scopes::default(),
            stacks: &mut stacks,
        };
        let nodes = Traverser::new().with_visitor(&mut gather).traverse(nodes)?;

        let mut fill = Fill {
            stacks: stacks.into_iter(),
        };
        Traverser::new().with_visitor(&mut fill).traverse(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{TrimRaw, prepare};
    use pretty_assertions::assert_eq;
    use quire_ast::Template;
    use quire_parser::Parser;

    fn collect(source: &str) -> Vec<Node> {
        let template = Parser::default().parse(source, None).unwrap();
        let nodes = prepare(vec![Node::Template(template)]).unwrap();
        let nodes = StackCollector.collect(nodes).unwrap();
        let mut trim = TrimRaw;
        let nodes = Traverser::new().with_visitor(&mut trim).traverse(nodes).unwrap();
        match nodes.into_iter().next() {
            Some(Node::Template(Template { nodes, .. })) => nodes,
            _ => panic!("template removed"),
        }
    }

    fn texts(node: &Node) -> Vec<String> {
        node.nodes()
            .into_iter()
            .flatten()
            .filter_map(|n| match n {
                Node::Raw(raw) => Some(raw.content.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_stack() {
        let nodes = collect("<stack:collect name=\"css\"/>");
        assert!(matches!(&nodes[0], Node::Aggregate(a) if a.nodes.is_empty()));
    }

    #[test]
    fn test_push_after() {
        let nodes = collect(
            "<stack:collect name=\"css\"/><stack:push name=\"css\">css</stack:push>\
             <stack:push name=\"css\">css2</stack:push>",
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(texts(&nodes[0]), vec!["css", "css2"]);
    }

    #[test]
    fn test_push_before() {
        let nodes = collect(
            "<stack:push name=\"css\">css2</stack:push><stack:collect name=\"css\"/>\
             <stack:push name=\"css\">css</stack:push>",
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(texts(&nodes[0]), vec!["css2", "css"]);
    }

    #[test]
    fn test_prepend() {
        let nodes = collect(
            "<stack:push name=\"css\">css2</stack:push><stack:collect name=\"css\"/>\
             <stack:prepend name=\"css\">css</stack:prepend>\
             <stack:prepend name=\"css\">css0</stack:prepend>",
        );
        assert_eq!(texts(&nodes[0]), vec!["css0", "css", "css2"]);
    }

    #[test]
    fn test_push_from_sub_tag() {
        let nodes = collect(
            "<div><stack:push name=\"css\">css2</stack:push></div>\
             <stack:collect name=\"css\"/>\
             <div><stack:prepend name=\"css\">css</stack:prepend></div>",
        );
        assert_eq!(nodes.len(), 3);
        assert_eq!(texts(&nodes[1]), vec!["css", "css2"]);
    }

    #[test]
    fn test_push_out_of_scope_is_kept() {
        let nodes = collect(
            "<div><stack:collect name=\"css\"/></div><stack:push name=\"css\">css2</stack:push>",
        );
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[1], Node::Tag(tag) if tag.name == PUSH_TAG));
    }

    #[test]
    fn test_level_reaches_outer_scope() {
        let nodes = collect(
            "<div><stack:collect name=\"css\" level=\"1\"/></div>\
             <stack:push name=\"css\">css2</stack:push>",
        );
        assert_eq!(nodes.len(), 1);
        let Node::Tag(div) = &nodes[0] else {
            panic!("expected tag");
        };
        assert_eq!(texts(&div.nodes[0]), vec!["css2"]);
    }

    #[test]
    fn test_sibling_scopes() {
        let nodes = collect(
            "<div><stack:collect name=\"css\"/><stack:push name=\"css\">a</stack:push></div>\
             <p><stack:push name=\"css\">b</stack:push><stack:collect name=\"css\"/></p>",
        );
        assert_eq!(nodes.len(), 2);
        let (Node::Tag(div), Node::Tag(p)) = (&nodes[0], &nodes[1]) else {
            panic!("expected tags");
        };
        assert_eq!(div.nodes.len(), 1);
        assert_eq!(texts(&div.nodes[0]), vec!["a"]);
        assert_eq!(p.nodes.len(), 1);
        assert_eq!(texts(&p.nodes[0]), vec!["b"]);
    }

    #[test]
    fn test_nested_scopes() {
        let nodes = collect(
            "<stack:collect name=\"css\"/>\
             <div><stack:collect name=\"css\"/><b><stack:push name=\"css\">inner</stack:push></b></div>\
             <stack:push name=\"css\">outer</stack:push>",
        );
        assert_eq!(nodes.len(), 2);
        assert_eq!(texts(&nodes[0]), vec!["outer"]);
        let Node::Tag(div) = &nodes[1] else {
            panic!("expected tag");
        };
        assert_eq!(texts(&div.nodes[0]), vec!["inner"]);
        assert!(matches!(&div.nodes[1], Node::Tag(b) if b.nodes.is_empty()));
    }

    #[test]
    fn test_same_scope_first_stack_wins() {
        let nodes = collect(
            "<stack:collect name=\"css\"/>\
             <div><stack:collect name=\"css\" level=\"1\"/></div>\
             <stack:push name=\"css\">css</stack:push>",
        );
        assert_eq!(nodes.len(), 2);
        assert_eq!(texts(&nodes[0]), vec!["css"]);
        let Node::Tag(div) = &nodes[1] else {
            panic!("expected tag");
        };
        assert!(matches!(&div.nodes[0], Node::Aggregate(a) if a.nodes.is_empty()));
    }

    #[test]
    fn test_unique_id() {
        let nodes = collect(
            "<stack:collect name=\"element\" level=\"2\"/>\
             <stack:push name=\"element\" unique-id=\"1\">1</stack:push>\
             <stack:push name=\"element\" unique-id=\"1\">2</stack:push>\
             <stack:push name=\"element\" unique-id=\"2\">3</stack:push>",
        );
        let Node::Aggregate(stack) = &nodes[0] else {
            panic!("expected aggregate");
        };
        assert_eq!(texts(&nodes[0]), vec!["1", "3"]);
        assert_eq!(stack.unique_ids, vec!["1", "2"]);
    }
}
