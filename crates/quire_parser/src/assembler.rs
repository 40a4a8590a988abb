use quire_ast::{Node, Tag};

use crate::error::ParserError;

/// Builds a node list from a flat sequence of syntax events.
///
/// Tags opened with [`Assembler::open`] receive every pushed node until they
/// are closed; everything else lands in the root list.
#[derive(Debug, Default)]
pub struct Assembler {
    nodes: Vec<Node>,
    open: Vec<Tag>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Innermost open tag.
    pub fn current_tag(&self) -> Option<&Tag> {
        self.open.last()
    }

    /// Appends a node to the innermost open tag, or to the root.
    pub fn push(&mut self, node: Node) {
        self.children().push(node);
    }

    /// Opens a tag; following nodes become its children.
    pub fn open(&mut self, tag: Tag) {
        self.open.push(tag);
    }

    /// Closes the innermost open tag and attaches it to its parent.
    ///
    /// Returns false when no tag is open.
    pub fn close(&mut self) -> bool {
        match self.open.pop() {
            Some(tag) => {
                self.push(Node::Tag(tag));
                true
            }
            None => false,
        }
    }

    /// Last node pushed to the current container.
    pub fn last_mut(&mut self) -> Option<&mut Node> {
        self.children().last_mut()
    }

    /// Returns the root nodes. Fails when a tag was never closed.
    pub fn finish(self) -> Result<Vec<Node>, ParserError> {
        if let Some(tag) = self.open.last() {
            return Err(ParserError::syntax(
                format!("Unclosed tag `{}`", tag.name),
                tag.context.clone(),
            ));
        }
        Ok(self.nodes)
    }

    fn children(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(tag) => &mut tag.nodes,
            None => &mut self.nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_ast::Raw;

    #[test]
    fn test_nesting() {
        let mut asm = Assembler::new();
        asm.push(Raw::new("a", None).into());
        asm.open(Tag::new("b", None));
        asm.push(Raw::new("c", None).into());
        assert_eq!(asm.current_tag().map(|t| t.name.as_str()), Some("b"));
        assert!(asm.close());

        let nodes = asm.finish().unwrap();
        assert_eq!(nodes.len(), 2);
        let Node::Tag(tag) = &nodes[1] else {
            panic!("expected tag");
        };
        assert_eq!(tag.nodes.len(), 1);
    }

    #[test]
    fn test_close_without_open() {
        let mut asm = Assembler::new();
        assert!(!asm.close());
    }

    #[test]
    fn test_unclosed_tag() {
        let mut asm = Assembler::new();
        asm.open(Tag::new("div", None));
        let err = asm.finish().unwrap_err();
        assert_eq!(err.to_string(), "Unclosed tag `div`");
    }
}
