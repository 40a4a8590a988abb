//! Merges a use-site tag into the template it imports or extends.
//!
//! The tag supplies *claims*: its attributes by name, its named child
//! blocks, and its remaining content as the `context` claim. Claims replace
//! the same-named blocks of the template, answer `inject()`/`injected()`
//! calls in echo and directive bodies, and whatever is left flows into the
//! attribute aggregates of the template.

use std::convert::Infallible;
use std::sync::Arc;

use quire_ast::visitor::{Leave, Signal, Traverser, Visitor, VisitorContext};
use quire_ast::{Attr, Block, Context, Mixin, Node, Raw, Tag, Value, split_values, unquote};
use tracing::{debug, warn};

use crate::error::CompileError;

/// Name of the claim holding the unnamed content of the use-site tag.
pub const CONTEXT: &str = "context";

/// Name of the block referring to the content a claim replaces.
pub const PARENT: &str = "parent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// `<use:*>` imports.
    Import,
    /// `<extends>` parents.
    Extends,
}

#[derive(Debug, Clone)]
enum Claim {
    /// An attribute of the use-site tag, value as written.
    Attr {
        value: Option<Value>,
        context: Option<Arc<Context>>,
    },
    /// A named block or the unnamed content.
    Nodes(Vec<Node>),
}

impl Claim {
    /// Content of the claim when substituted into a block. Surrounding
    /// quotes of attribute values are removed.
    fn nodes(&self) -> Vec<Node> {
        match self {
            Claim::Nodes(nodes) => nodes.clone(),
            Claim::Attr { value: None, .. } => Vec::new(),
            Claim::Attr {
                value: Some(Value::Text(text)),
                context,
            } => vec![Raw::new(unquote(text), context.clone()).into()],
            Claim::Attr {
                value: Some(Value::Node(node)),
                ..
            } => match node.as_ref() {
                Node::Mixin(mixin) => strip_quotes(mixin.nodes.clone()),
                Node::Verbatim(verbatim) => strip_quotes(verbatim.nodes.clone()),
                other => vec![other.clone()],
            },
        }
    }

    /// Host language literal of the claim, or `None` when part of it is only
    /// known at runtime.
    fn literal(&self) -> Option<String> {
        if let Claim::Attr { value: None, .. } = self {
            return Some("true".to_string());
        }

        let nodes = self.nodes();
        if nodes.is_empty() {
            return Some("''".to_string());
        }

        let parts = nodes.iter().map(literal).collect::<Option<Vec<_>>>()?;
        Some(parts.join("."))
    }
}

fn literal(node: &Node) -> Option<String> {
    match node {
        Node::Raw(raw) => Some(format!(
            "'{}'",
            raw.content.replace('\\', "\\\\").replace('\'', "\\'")
        )),
        Node::Output(output) => Some(output.body.trim().to_string()),
        Node::Php(php) => php.echoed().map(str::to_string),
        Node::Mixin(mixin) => {
            let parts = mixin.nodes.iter().map(literal).collect::<Option<Vec<_>>>()?;
            (!parts.is_empty()).then(|| parts.join("."))
        }
        _ => None,
    }
}

/// Removes the quote characters wrapping an attribute value split into
/// nodes.
fn strip_quotes(mut nodes: Vec<Node>) -> Vec<Node> {
    let quote = match nodes.first() {
        Some(Node::Raw(raw)) => raw.content.chars().next().filter(|c| *c == '"' || *c == '\''),
        _ => None,
    };

    if let Some(quote) = quote {
        if let Some(Node::Raw(first)) = nodes.first_mut() {
            first.content.remove(0);
        }
        if let Some(Node::Raw(last)) = nodes.last_mut()
            && last.content.ends_with(quote)
        {
            last.content.pop();
        }
    }

    nodes.retain(|node| !matches!(node, Node::Raw(raw) if raw.content.is_empty()));
    nodes
}

/// Claims made by a use-site tag, in declaration order.
#[derive(Debug, Default)]
struct Claims {
    entries: Vec<(String, Claim, bool)>,
    /// Attributes with a dynamic name.
    dynamic: Vec<Node>,
}

impl Claims {
    fn from_tag(tag: Tag, mode: MergeMode) -> Self {
        let mut claims = Self::default();

        for node in tag.attrs {
            match node {
                Node::Attr(attr) => match attr.name.as_text() {
                    Some("path") if mode == MergeMode::Extends => {}
                    Some(name) => {
                        let name = name.to_string();
                        claims.insert(
                            name,
                            Claim::Attr {
                                value: attr.value,
                                context: attr.context,
                            },
                        );
                    }
                    None => claims.dynamic.push(Node::Attr(attr)),
                },
                other => debug!(kind = %other.kind(), "ignoring use-site attribute node"),
            }
        }

        let mut leftovers = Vec::new();
        for node in tag.nodes {
            match node {
                Node::Block(Block {
                    name: Some(name),
                    nodes,
                    ..
                }) => claims.insert(name, Claim::Nodes(nodes)),
                other => leftovers.push(other),
            }
        }

        if leftovers.iter().all(Node::is_whitespace) {
            return claims;
        }

        match claims.entries.iter_mut().find(|(name, ..)| name == CONTEXT) {
            None => claims.entries.push((CONTEXT.to_string(), Claim::Nodes(leftovers), false)),
            Some((_, claim, _)) if mode == MergeMode::Extends => {
                let mut nodes = claim.nodes();
                nodes.extend(leftovers);
                *claim = Claim::Nodes(nodes);
            }
            Some(_) => warn!(
                tag = %tag.name,
                "content conflicts with an explicit `context` block and is dropped"
            ),
        }

        claims
    }

    fn insert(&mut self, name: String, claim: Claim) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, ..)| *n == name) {
            warn!(block = %name, "`{}` is declared more than once, the last one wins", name);
            entry.1 = claim;
            return;
        }
        self.entries.push((name, claim, false));
    }

    fn get(&self, name: &str) -> Option<&Claim> {
        self.entries.iter().find(|(n, ..)| n == name).map(|(_, claim, _)| claim)
    }

    fn mark_used(&mut self, name: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, ..)| n == name) {
            entry.2 = true;
        }
    }
}

/// Replaces claimed blocks and resolves injections.
struct Substitute<'c> {
    claims: &'c mut Claims,
}

impl Substitute<'_> {
    fn claimed<'n>(&self, node: &'n Node) -> Option<&'n str> {
        match node {
            Node::Block(Block { name: Some(name), .. }) if self.claims.get(name).is_some() => {
                Some(name.as_str())
            }
            _ => None,
        }
    }

    fn block(&mut self, block: Block) -> Node {
        let Some(name) = block.name.as_deref() else {
            return block.into();
        };
        let Some(claim) = self.claims.get(name) else {
            return block.into();
        };

        let nodes = replace_parent(claim.nodes(), &block.nodes);
        self.claims.mark_used(name);
        Block::new(block.name, nodes, block.context).into()
    }

    fn inject(&mut self, body: &str) -> String {
        let body = rewrite_calls(body, "injected", |args| {
            let name = static_name(args.first()?)?;
            Some(self.claims.get(&name).is_some().to_string())
        });

        rewrite_calls(&body, "inject", |args| {
            if args.is_empty() || args.len() > 2 {
                return None;
            }
            let name = static_name(&args[0])?;
            let literal = self.claims.get(&name)?.literal()?;
            self.claims.mark_used(&name);
            Some(literal)
        })
    }
}

impl Visitor for Substitute<'_> {
    type Error = CompileError;

    fn enter_node(&mut self, node: &mut Node, _ctx: &VisitorContext) -> Result<Signal, CompileError> {
        Ok(match self.claimed(node) {
            Some(_) => Signal::SkipChildren,
            None => Signal::Continue,
        })
    }

    fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        Ok(match node {
            Node::Block(block) => self.block(block).into(),
            Node::Output(mut output) => {
                output.body = self.inject(&output.body);
                Node::Output(output).into()
            }
            Node::Directive(mut directive) => {
                if let Some(body) = directive.body.take() {
                    let body = self.inject(&body);
                    directive.set_body(body);
                }
                Node::Directive(directive).into()
            }
            other => other.into(),
        })
    }
}

/// Replaces `parent` blocks within claimed content by the content the claim
/// overrides.
fn replace_parent(nodes: Vec<Node>, original: &[Node]) -> Vec<Node> {
    struct Parent<'o>(&'o [Node]);

    impl Visitor for Parent<'_> {
        type Error = Infallible;

        fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, Infallible> {
            Ok(match node {
                Node::Block(block) if block.name.as_deref() == Some(PARENT) => Node::Mixin(Mixin {
                    nodes: self.0.to_vec(),
                    context: block.context,
                })
                .into(),
                other => other.into(),
            })
        }
    }

    let mut parent = Parent(original);
    match Traverser::new().with_visitor(&mut parent).traverse(nodes) {
        Ok(nodes) => nodes,
        Err(never) => match never {},
    }
}

/// Quoted string argument of an injection call.
fn static_name(arg: &str) -> Option<String> {
    let arg = arg.trim();
    let name = unquote(arg);
    (name.len() + 2 == arg.len() && !name.is_empty()).then(|| name.to_string())
}

/// Rewrites every `function(args)` call in `code`. Calls for which `resolve`
/// returns `None` are kept as written.
fn rewrite_calls(
    code: &str,
    function: &str,
    mut resolve: impl FnMut(&[String]) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;

    while let Some(index) = rest.find(function) {
        let (head, tail) = rest.split_at(index);
        out.push_str(head);

        let boundary = head
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || matches!(c, '_' | '$' | '>' | ':' | '\\')));
        let after = &tail[function.len()..];
        let args_start = after.trim_start();

        let call = (boundary && args_start.starts_with('('))
            .then(|| closing_paren(args_start))
            .flatten()
            .and_then(|close| {
                let inner = &args_start[1..close];
                let consumed = function.len() + (after.len() - args_start.len()) + close + 1;
                let args = split_values(inner)?;
                resolve(args.as_slice()).map(|replacement| (replacement, consumed))
            });

        match call {
            Some((replacement, consumed)) => {
                out.push_str(&replacement);
                rest = &tail[consumed..];
            }
            None => {
                out.push_str(function);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Byte index of the parenthesis closing the one `code` starts with.
fn closing_paren(code: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, ch) in code.char_indices() {
        if let Some(q) = quote {
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
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Hands claims nobody used to the attribute aggregates of the template.
struct Distribute {
    remaining: Vec<(String, Claim)>,
    dynamic: Vec<Node>,
}

impl Distribute {
    fn attr(name: String, claim: Claim) -> Node {
        match claim {
            Claim::Attr { value, context } => Attr::new(name, value, context).into(),
            Claim::Nodes(nodes) => {
                let context = nodes.first().and_then(|n| n.context().cloned());
                let mut value = vec![Raw::new("\"", None).into()];
                value.extend(nodes);
                value.push(Raw::new("\"", None).into());
                let value = Mixin {
                    nodes: value,
                    context: context.clone(),
                };
                Attr::new(name, Some(Node::Mixin(value).into()), context).into()
            }
        }
    }
}

impl Visitor for Distribute {
    type Error = CompileError;

    fn enter_node(&mut self, node: &mut Node, _ctx: &VisitorContext) -> Result<Signal, CompileError> {
        let Node::Tag(tag) = node else {
            return Ok(Signal::Continue);
        };

        for attr in &mut tag.attrs {
            let Node::Aggregate(aggregate) = attr else {
                continue;
            };
            if aggregate.is_stack() {
                continue;
            }

            aggregate.nodes.append(&mut self.dynamic);

            let mut kept = Vec::new();
            for (name, claim) in self.remaining.drain(..) {
                match aggregate.accepts(&name) {
                    Some(accepted) => aggregate.nodes.push(Self::attr(accepted, claim)),
                    None => kept.push((name, claim)),
                }
            }
            self.remaining = kept;
        }
        Ok(Signal::Continue)
    }
}

/// Merges use-site tags into templates.
#[derive(Debug, Clone, Copy)]
pub struct Merger {
    mode: MergeMode,
}

impl Merger {
    pub fn new(mode: MergeMode) -> Self {
        Self { mode }
    }

    /// Merges `tag` into the `nodes` of the imported or parent template.
    pub fn merge(&self, nodes: Vec<Node>, tag: Tag) -> Result<Vec<Node>, CompileError> {
        let mut claims = Claims::from_tag(tag, self.mode);

        let mut substitute = Substitute {
            claims: &mut claims,
        };
        let nodes = Traverser::new().with_visitor(&mut substitute).traverse(nodes)?;

        let mut context = None;
        let mut remaining = Vec::new();
        for (name, claim, used) in claims.entries {
            if used {
                continue;
            }
            if name == CONTEXT {
                context = Some(claim);
            } else {
                remaining.push((name, claim));
            }
        }

        let mut distribute = Distribute {
            remaining,
            dynamic: claims.dynamic,
        };
        let mut nodes = Traverser::new().with_visitor(&mut distribute).traverse(nodes)?;

        for (name, _) in &distribute.remaining {
            debug!(claim = %name, "claim is not used by the template");
        }
        if !distribute.dynamic.is_empty() {
            debug!(count = distribute.dynamic.len(), "dynamic attributes are not aggregated");
        }

        if let Some(claim) = context {
            match self.mode {
                MergeMode::Extends => nodes.extend(claim.nodes()),
                MergeMode::Import => debug!("`context` is not used by the template"),
            }
        }

        Ok(nodes)
    }
}
