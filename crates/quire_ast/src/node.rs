//! Template AST nodes.
//!
//! Nodes own their children. Transforms rebuild child lists rather than
//! patching them in place, see [`crate::visitor`].

use std::fmt;
use std::sync::Arc;

use quire_lexer::Token;
use serde::Serialize;

use crate::context::Context;
use crate::pattern::Pattern;

/// A node of the template tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Node {
    Template(Template),
    Tag(Tag),
    Attr(Attr),
    Output(Output),
    Directive(Directive),
    Raw(Raw),
    Php(Php),
    Block(Block),
    Mixin(Mixin),
    Aggregate(Aggregate),
    Hidden(Hidden),
    Verbatim(Verbatim),
}

/// Discriminant of [`Node`], used where the payload is not available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Template,
    Tag,
    Attr,
    Output,
    Directive,
    Raw,
    Php,
    Block,
    Mixin,
    Aggregate,
    Hidden,
    Verbatim,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Transform metadata attached to templates, tags and aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "meta", content = "value")]
pub enum Meta {
    /// Pending `extends` tag, merged with the parent template when the
    /// owning node is left.
    Extends(Box<Tag>),
    /// Number of enclosing scopes a stack collects pushes from.
    StackLevel(usize),
}

/// Root of a parsed template.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Template {
    pub nodes: Vec<Node>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Meta>,
    pub context: Option<Arc<Context>>,
}

impl Template {
    pub fn new(context: Option<Arc<Context>>) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    /// Creates a template holding the given nodes.
    pub fn with_nodes(nodes: Vec<Node>, context: Option<Arc<Context>>) -> Self {
        Self {
            nodes,
            attributes: Vec::new(),
            context,
        }
    }
}

/// An HTML element.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Tag {
    pub name: String,
    /// [`Attr`] nodes, plus [`Aggregate`]s once attributes are defined.
    pub attrs: Vec<Node>,
    pub nodes: Vec<Node>,
    /// The element has no closing tag.
    pub void: bool,
    /// The element was written as `<name/>`.
    pub self_closing: bool,
    /// Whitespace written before `>` or `/>`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trailing: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Meta>,
    pub context: Option<Arc<Context>>,
}

impl Tag {
    pub fn new(name: impl Into<String>, context: Option<Arc<Context>>) -> Self {
        Self {
            name: name.into(),
            context,
            ..Self::default()
        }
    }

    /// Returns the first attribute with a static name equal to `name`.
    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attrs.iter().find_map(|node| match node {
            Node::Attr(attr) if attr.name.as_text() == Some(name) => Some(attr),
            _ => None,
        })
    }

    /// Static value of an attribute with surrounding quotes removed.
    ///
    /// Returns `None` when the attribute is missing or its value is dynamic.
    pub fn attr_text(&self, name: &str) -> Option<String> {
        self.attr(name).and_then(Attr::value_text)
    }
}

/// Text or node slot, used for attribute names and values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Node(Box<Node>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            Value::Node(_) => None,
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(Box::new(node))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

/// A tag attribute. A `None` value is a bare attribute such as `checked`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attr {
    pub name: Value,
    pub value: Option<Value>,
    /// Whitespace written before the attribute. `None` renders a single space.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<String>,
    pub context: Option<Arc<Context>>,
}

impl Attr {
    pub fn new(name: impl Into<Value>, value: Option<Value>, context: Option<Arc<Context>>) -> Self {
        Self {
            name: name.into(),
            value,
            spacing: None,
            context,
        }
    }

    /// Static value with surrounding quotes removed.
    pub fn value_text(&self) -> Option<String> {
        match &self.value {
            Some(Value::Text(text)) => Some(unquote(text).to_string()),
            _ => None,
        }
    }
}

/// An echo statement: `{{ body }}` or `{!! body !!}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub body: String,
    /// Written as `{!! !!}`: no escaping.
    pub raw: bool,
    /// Named filter from a trailing `|name` annotation, replacing the default wrapping.
    pub filter: Option<String>,
    pub context: Option<Arc<Context>>,
}

/// A `@name(body)` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directive {
    pub name: String,
    pub body: Option<String>,
    /// Body split at top level commas.
    pub values: Vec<String>,
    pub context: Option<Arc<Context>>,
}

impl Directive {
    /// Replaces the body and recomputes the value list.
    pub fn set_body(&mut self, body: String) {
        self.values = split_values(&body).unwrap_or_else(|| vec![body.trim().to_string()]);
        self.body = Some(body);
    }
}

/// Plain content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Raw {
    pub content: String,
    pub context: Option<Arc<Context>>,
}

impl Raw {
    pub fn new(content: impl Into<String>, context: Option<Arc<Context>>) -> Self {
        Self {
            content: content.into(),
            context,
        }
    }
}

/// A host language block, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Php {
    pub content: String,
    #[serde(skip)]
    pub tokens: Vec<Token>,
    pub context: Option<Arc<Context>>,
}

impl Php {
    /// Expression echoed by a `<?= x ?>` or `<?php echo x; ?>` block.
    pub fn echoed(&self) -> Option<&str> {
        let code = self.content.trim().strip_suffix("?>")?;
        let expr = if let Some(rest) = code.strip_prefix("<?=") {
            rest
        } else {
            let rest = code.strip_prefix("<?php")?.trim_start();
            rest.strip_prefix("echo")
                .filter(|r| r.starts_with(char::is_whitespace))?
        };
        let expr = expr.trim().trim_end_matches(';').trim_end();
        (!expr.is_empty()).then_some(expr)
    }
}

/// Named placeholder which can be overridden by extending or importing
/// templates.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Block {
    pub name: Option<String>,
    pub nodes: Vec<Node>,
    pub context: Option<Arc<Context>>,
}

impl Block {
    pub fn new(name: Option<String>, nodes: Vec<Node>, context: Option<Arc<Context>>) -> Self {
        Self {
            name,
            nodes,
            context,
        }
    }
}

/// Sequence of text and nodes rendered inline, such as an attribute value
/// containing echo statements.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Mixin {
    pub nodes: Vec<Node>,
    pub context: Option<Arc<Context>>,
}

/// Collects attributes or stack content matching a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub pattern: Pattern,
    pub nodes: Vec<Node>,
    /// `unique-id`s of content already collected.
    pub unique_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Meta>,
    pub context: Option<Arc<Context>>,
}

impl Aggregate {
    pub fn new(pattern: Pattern, context: Option<Arc<Context>>) -> Self {
        Self {
            pattern,
            nodes: Vec::new(),
            unique_ids: Vec::new(),
            attributes: Vec::new(),
            context,
        }
    }

    /// Returns the collected name for `name`, see [`Pattern::accepts`].
    pub fn accepts(&self, name: &str) -> Option<String> {
        self.pattern.accepts(name)
    }

    /// Returns true for aggregates created by `<stack:collect>`.
    pub fn is_stack(&self) -> bool {
        self.attributes
            .iter()
            .any(|meta| matches!(meta, Meta::StackLevel(_)))
    }

    /// Stack collection level, zero when not set.
    pub fn level(&self) -> usize {
        self.attributes
            .iter()
            .find_map(|meta| match meta {
                Meta::StackLevel(level) => Some(*level),
                Meta::Extends(_) => None,
            })
            .unwrap_or_default()
    }
}

/// Traversable content that is never rendered.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Hidden {
    pub nodes: Vec<Node>,
}

/// Content which is not parsed for tags: script bodies and event attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Verbatim {
    pub nodes: Vec<Node>,
    pub context: Option<Arc<Context>>,
}

macro_rules! impl_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Node {
                fn from(node: $variant) -> Self {
                    Node::$variant(node)
                }
            }
        )*
    };
}

impl_from!(
    Template, Tag, Attr, Output, Directive, Raw, Php, Block, Mixin, Aggregate, Hidden, Verbatim,
);

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Template(_) => NodeKind::Template,
            Node::Tag(_) => NodeKind::Tag,
            Node::Attr(_) => NodeKind::Attr,
            Node::Output(_) => NodeKind::Output,
            Node::Directive(_) => NodeKind::Directive,
            Node::Raw(_) => NodeKind::Raw,
            Node::Php(_) => NodeKind::Php,
            Node::Block(_) => NodeKind::Block,
            Node::Mixin(_) => NodeKind::Mixin,
            Node::Aggregate(_) => NodeKind::Aggregate,
            Node::Hidden(_) => NodeKind::Hidden,
            Node::Verbatim(_) => NodeKind::Verbatim,
        }
    }

    /// Source context. Hidden nodes never carry one.
    pub fn context(&self) -> Option<&Arc<Context>> {
        match self {
            Node::Template(n) => n.context.as_ref(),
            Node::Tag(n) => n.context.as_ref(),
            Node::Attr(n) => n.context.as_ref(),
            Node::Output(n) => n.context.as_ref(),
            Node::Directive(n) => n.context.as_ref(),
            Node::Raw(n) => n.context.as_ref(),
            Node::Php(n) => n.context.as_ref(),
            Node::Block(n) => n.context.as_ref(),
            Node::Mixin(n) => n.context.as_ref(),
            Node::Aggregate(n) => n.context.as_ref(),
            Node::Verbatim(n) => n.context.as_ref(),
            Node::Hidden(_) => None,
        }
    }

    /// Content children. Tag attributes are not included.
    pub fn nodes(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Template(n) => Some(&n.nodes),
            Node::Tag(n) => Some(&n.nodes),
            Node::Block(n) => Some(&n.nodes),
            Node::Mixin(n) => Some(&n.nodes),
            Node::Aggregate(n) => Some(&n.nodes),
            Node::Hidden(n) => Some(&n.nodes),
            Node::Verbatim(n) => Some(&n.nodes),
            Node::Attr(_) | Node::Output(_) | Node::Directive(_) | Node::Raw(_) | Node::Php(_) => {
                None
            }
        }
    }

    pub fn nodes_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Template(n) => Some(&mut n.nodes),
            Node::Tag(n) => Some(&mut n.nodes),
            Node::Block(n) => Some(&mut n.nodes),
            Node::Mixin(n) => Some(&mut n.nodes),
            Node::Aggregate(n) => Some(&mut n.nodes),
            Node::Hidden(n) => Some(&mut n.nodes),
            Node::Verbatim(n) => Some(&mut n.nodes),
            Node::Attr(_) | Node::Output(_) | Node::Directive(_) | Node::Raw(_) | Node::Php(_) => {
                None
            }
        }
    }

    /// Metadata slot of nodes which can hold [`Meta`].
    pub fn attributes_mut(&mut self) -> Option<&mut Vec<Meta>> {
        match self {
            Node::Template(n) => Some(&mut n.attributes),
            Node::Tag(n) => Some(&mut n.attributes),
            Node::Aggregate(n) => Some(&mut n.attributes),
            _ => None,
        }
    }

    /// Returns true for raw text made only of whitespace.
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Node::Raw(raw) if raw.content.trim().is_empty())
    }
}

/// Removes one pair of matching surrounding quotes.
pub fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Splits a directive body at top level commas.
///
/// Commas inside quotes or brackets do not split. Returns `None` when quotes
/// or brackets are unbalanced.
pub fn split_values(body: &str) -> Option<Vec<String>> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut brackets: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in body.chars() {
        if let Some(q) = quote {
            current.push(ch);
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if ch == q => quote = None,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' | '{' => brackets.push(ch),
            ')' | ']' | '}' => {
                let open = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if brackets.pop() != Some(open) {
                    return None;
                }
            }
            ',' if brackets.is_empty() => {
                values.push(std::mem::take(&mut current).trim().to_string());
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    if quote.is_some() || !brackets.is_empty() {
        return None;
    }

    if !current.trim().is_empty() || !values.is_empty() {
        values.push(current.trim().to_string());
    }
    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("$a", &["$a"])]
    #[case("$items as $item", &["$items as $item"])]
    #[case("$a, [1, 2], fn($x, $y)", &["$a", "[1, 2]", "fn($x, $y)"])]
    #[case("'a,b', \"c\\\",d\"", &["'a,b'", "\"c\\\",d\""])]
    #[case("", &[])]
    #[case("a,", &["a", ""])]
    fn test_split_values(#[case] body: &str, #[case] expected: &[&str]) {
        assert_eq!(split_values(body).unwrap(), expected);
    }

    #[rstest]
    #[case("[1, 2")]
    #[case("(]")]
    #[case("}")]
    #[case("'open")]
    fn test_split_values_unbalanced(#[case] body: &str) {
        assert_eq!(split_values(body), None);
    }

    #[rstest]
    #[case("\"value\"", "value")]
    #[case("'value'", "value")]
    #[case("value", "value")]
    #[case("\"value'", "\"value'")]
    #[case("\"", "\"")]
    fn test_unquote(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(unquote(value), expected);
    }

    #[rstest]
    #[case("<?= 'red' ?>", Some("'red'"))]
    #[case("<?php echo 'bad'?>", Some("'bad'"))]
    #[case("<?php echo $x; ?>", Some("$x"))]
    #[case("<?php if ($x): ?>", None)]
    #[case("<?php echoes(); ?>", None)]
    fn test_php_echoed(#[case] content: &str, #[case] expected: Option<&str>) {
        let php = Php {
            content: content.to_string(),
            tokens: Vec::new(),
            context: None,
        };
        assert_eq!(php.echoed(), expected);
    }

    #[test]
    fn test_tag_attr_text() {
        let mut tag = Tag::new("use:element", None);
        tag.attrs.push(Attr::new("path", Some("\"a/b\"".into()), None).into());
        tag.attrs.push(Attr::new("checked", None, None).into());

        assert_eq!(tag.attr_text("path").as_deref(), Some("a/b"));
        assert_eq!(tag.attr_text("checked"), None);
        assert!(tag.attr("checked").is_some());
        assert!(tag.attr("missing").is_none());
    }

    #[test]
    fn test_directive_set_body() {
        let mut directive = Directive {
            name: "json".into(),
            body: None,
            values: Vec::new(),
            context: None,
        };
        directive.set_body("$data, JSON_PRETTY_PRINT".into());
        assert_eq!(directive.values, vec!["$data", "JSON_PRETTY_PRINT"]);
    }

    #[test]
    fn test_aggregate_level() {
        let mut aggregate = Aggregate::new(Pattern::Include(vec!["css".into()]), None);
        assert_eq!(aggregate.level(), 0);
        assert!(!aggregate.is_stack());
        aggregate.attributes.push(Meta::StackLevel(2));
        assert_eq!(aggregate.level(), 2);
        assert!(aggregate.is_stack());
    }

    #[test]
    fn test_serialize_tag() {
        let mut tag = Tag::new("b", None);
        tag.nodes.push(Raw::new("hi", None).into());
        insta::assert_json_snapshot!(Node::Tag(tag), @r#"
        {
          "type": "Tag",
          "name": "b",
          "attrs": [],
          "nodes": [
            {
              "type": "Raw",
              "content": "hi",
              "context": null
            }
          ],
          "void": false,
          "self_closing": false,
          "context": null
        }
        "#);
    }
}
