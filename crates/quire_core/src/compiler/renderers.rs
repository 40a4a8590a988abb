//! Renderers for the built-in node kinds.

use std::collections::BTreeMap;
use std::sync::Arc;

use quire_ast::{Attr, Context, Directive, Node, Output, Tag, Value};

use super::{CompileResult, Compiler, Renderer};
use crate::directive::DirectiveGroup;
use crate::error::CompileError;

/// Structural nodes: templates, blocks, mixins, aggregates, hidden content
/// and raw text.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreRenderer;

impl Renderer for CoreRenderer {
    fn render(
        &self,
        compiler: &Compiler,
        result: &mut CompileResult,
        node: &Node,
    ) -> Result<bool, CompileError> {
        match node {
            Node::Template(template) => compiler.render_all(result, &template.nodes)?,
            Node::Block(block) => compiler.render_all(result, &block.nodes)?,
            Node::Mixin(mixin) => compiler.render_all(result, &mixin.nodes)?,
            Node::Aggregate(aggregate) => compiler.render_all(result, &aggregate.nodes)?,
            Node::Hidden(_) => {}
            Node::Raw(raw) => result.push(raw.content.as_str(), raw.context.as_ref()),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Host language blocks, emitted verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpRenderer;

impl Renderer for PhpRenderer {
    fn render(
        &self,
        _compiler: &Compiler,
        result: &mut CompileResult,
        node: &Node,
    ) -> Result<bool, CompileError> {
        match node {
            Node::Php(php) => {
                result.push(php.content.as_str(), php.context.as_ref());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Whitespace written before an attribute, a single space when synthesized.
fn spacing(node: &Node) -> &str {
    match node {
        Node::Attr(Attr {
            spacing: Some(spacing),
            ..
        }) => spacing,
        _ => " ",
    }
}

/// Tags, attributes and verbatim content.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    fn tag(&self, compiler: &Compiler, result: &mut CompileResult, tag: &Tag) -> Result<(), CompileError> {
        let context = tag.context.as_ref();
        result.push(format!("<{}", tag.name), context);

        for attr in &tag.attrs {
            match attr {
                Node::Aggregate(aggregate) => {
                    for node in &aggregate.nodes {
                        result.push(spacing(node), context);
                        compiler.render(result, node)?;
                    }
                }
                node => {
                    result.push(spacing(node), context);
                    compiler.render(result, node)?;
                }
            }
        }

        result.push(tag.trailing.as_str(), context);
        if tag.self_closing {
            result.push("/>", context);
            return Ok(());
        }
        result.push(">", context);

        if !tag.void {
            compiler.render_all(result, &tag.nodes)?;
            result.push(format!("</{}>", tag.name), context);
        }
        Ok(())
    }

    fn attr(&self, compiler: &Compiler, result: &mut CompileResult, attr: &Attr) -> Result<(), CompileError> {
        let context = attr.context.as_ref();
        self.value(compiler, result, &attr.name, context)?;

        if let Some(value) = &attr.value {
            result.push("=", context);
            self.value(compiler, result, value, context)?;
        }
        Ok(())
    }

    fn value(
        &self,
        compiler: &Compiler,
        result: &mut CompileResult,
        value: &Value,
        context: Option<&Arc<Context>>,
    ) -> Result<(), CompileError> {
        match value {
            Value::Text(text) => {
                result.push(text.as_str(), context);
                Ok(())
            }
            Value::Node(node) => compiler.render(result, node),
        }
    }
}

impl Renderer for HtmlRenderer {
    fn render(
        &self,
        compiler: &Compiler,
        result: &mut CompileResult,
        node: &Node,
    ) -> Result<bool, CompileError> {
        match node {
            Node::Tag(tag) => self.tag(compiler, result, tag)?,
            Node::Attr(attr) => self.attr(compiler, result, attr)?,
            Node::Verbatim(verbatim) => compiler.render_all(result, &verbatim.nodes)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Echo statements and directives.
#[derive(Debug)]
pub struct DynamicRenderer {
    escaped_filter: String,
    raw_filter: String,
    /// Wrappings selected by name with `{{ expr |name }}`.
    filters: BTreeMap<String, String>,
    directives: DirectiveGroup,
}

impl DynamicRenderer {
    /// Filters must contain a single `%s` placeholder for the echoed
    /// expression.
    pub fn new(escaped_filter: &str, raw_filter: &str, directives: DirectiveGroup) -> Self {
        Self {
            escaped_filter: escaped_filter.to_string(),
            raw_filter: raw_filter.to_string(),
            filters: BTreeMap::new(),
            directives,
        }
    }

    /// Adds named filters. `escaped` and `raw` name the default wrappings
    /// unless overridden here.
    #[must_use]
    pub fn with_filters(mut self, filters: &BTreeMap<String, String>) -> Self {
        self.filters
            .extend(filters.iter().map(|(name, filter)| (name.clone(), filter.clone())));
        self
    }

    fn filter(&self, output: &Output) -> Result<&str, CompileError> {
        let Some(name) = &output.filter else {
            return Ok(if output.raw {
                &self.raw_filter
            } else {
                &self.escaped_filter
            });
        };

        match (self.filters.get(name), name.as_str()) {
            (Some(filter), _) => Ok(filter),
            (None, "escaped") => Ok(&self.escaped_filter),
            (None, "raw") => Ok(&self.raw_filter),
            (None, _) => Err(CompileError::render(
                format!("Undefined output filter `{name}`"),
                output.context.clone(),
            )),
        }
    }

    pub fn directives(&self) -> &DirectiveGroup {
        &self.directives
    }

    fn output(&self, output: &Output) -> Result<String, CompileError> {
        let filter = self.filter(output)?;

        let body = output.body.trim();
        let body = if !output.raw && has_loose_whitespace(body) {
            format!("({body})")
        } else {
            body.to_string()
        };

        Ok(filter.replacen("%s", &body, 1))
    }

    fn directive(&self, directive: &Directive) -> Result<String, CompileError> {
        self.directives.render(directive)?.ok_or_else(|| {
            CompileError::directive(
                format!("Undefined directive `@{}`", directive.name),
                directive.context.clone(),
            )
        })
    }
}

impl Renderer for DynamicRenderer {
    fn render(
        &self,
        _compiler: &Compiler,
        result: &mut CompileResult,
        node: &Node,
    ) -> Result<bool, CompileError> {
        match node {
            Node::Output(output) => {
                let code = self.output(output)?;
                result.push(code, output.context.as_ref());
            }
            Node::Directive(directive) => {
                let code = self.directive(directive)?;
                result.push(code, directive.context.as_ref());
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Returns true when `expr` has whitespace outside of quotes and brackets,
/// so that `1 + 1` is cast as a whole once wrapped by the escaping filter.
fn has_loose_whitespace(expr: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in expr.chars() {
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
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if ch.is_whitespace() && depth == 0 => return true,
            _ => {}
        }
    }
    false
}
