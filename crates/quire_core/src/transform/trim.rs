use quire_ast::Node;
use quire_ast::visitor::{Leave, Signal, Visitor, VisitorContext};

use crate::error::CompileError;

/// Drops whitespace-only text between nodes. Attribute values and verbatim
/// content are left alone.
#[derive(Debug, Default)]
pub struct TrimRaw;

impl Visitor for TrimRaw {
    type Error = CompileError;

    fn enter_node(&mut self, node: &mut Node, _ctx: &VisitorContext) -> Result<Signal, CompileError> {
        Ok(match node {
            Node::Attr(_) | Node::Verbatim(_) | Node::Php(_) => Signal::SkipChildren,
            _ => Signal::Continue,
        })
    }

    fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        Ok(if node.is_whitespace() {
            Leave::Remove
        } else {
            node.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_ast::visitor::Traverser;
    use quire_parser::Parser;

    #[test]
    fn test_trim_raw() {
        let template = Parser::default()
            .parse("<div>\n  <b> x </b>\n</div>\n<script>\n</script>", None)
            .unwrap();

        let mut trim = TrimRaw;
        let nodes = Traverser::new().with_visitor(&mut trim).traverse(template.nodes).unwrap();

        assert_eq!(nodes.len(), 2);
        let Node::Tag(div) = &nodes[0] else {
            panic!("expected tag");
        };
        assert_eq!(div.nodes.len(), 1);
        let Node::Tag(b) = &div.nodes[0] else {
            panic!("expected tag");
        };
        assert!(matches!(&b.nodes[0], Node::Raw(raw) if raw.content == " x "));
    }
}
