//! Rendering of transformed templates.
//!
//! The [`Compiler`] walks a template and hands every node to its
//! [`Renderer`]s in registration order. A renderer returns `false` to decline
//! a node; a node nobody renders aborts the compile.

mod renderers;
mod result;
mod source_map;

pub use renderers::{CoreRenderer, DynamicRenderer, HtmlRenderer, PhpRenderer};
pub use result::{CompileResult, Fragment};
pub use source_map::{LineMapping, SourceMap};

use quire_ast::{Node, Template};

use crate::config::CompilerConfig;
use crate::directive::DirectiveGroup;
use crate::error::CompileError;

/// Renders one or more node kinds.
pub trait Renderer {
    /// Returns `Ok(false)` when the node is not handled by this renderer.
    fn render(
        &self,
        compiler: &Compiler,
        result: &mut CompileResult,
        node: &Node,
    ) -> Result<bool, CompileError>;
}

/// Ordered renderer chain.
#[derive(Default)]
pub struct Compiler {
    renderers: Vec<Box<dyn Renderer>>,
}

impl Compiler {
    /// Creates a compiler without renderers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the standard renderer chain: core, php, html, dynamic.
    pub fn from_config(config: &CompilerConfig) -> Self {
        let dynamic = DynamicRenderer::new(
            &config.escaped_filter,
            &config.raw_filter,
            DirectiveGroup::from_families(&config.directives),
        )
        .with_filters(&config.filters);

        Self::new()
            .with_renderer(CoreRenderer)
            .with_renderer(PhpRenderer)
            .with_renderer(HtmlRenderer)
            .with_renderer(dynamic)
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    pub fn compile(&self, template: &Template) -> Result<CompileResult, CompileError> {
        let mut result = CompileResult::new();
        self.render_all(&mut result, &template.nodes)?;
        Ok(result)
    }

    /// Renders a single node with the first renderer accepting it.
    pub fn render(&self, result: &mut CompileResult, node: &Node) -> Result<(), CompileError> {
        for renderer in &self.renderers {
            if renderer.render(self, result, node)? {
                return Ok(());
            }
        }

        Err(CompileError::render(
            format!("Unable to render node `{}`", node.kind()),
            node.context().cloned(),
        ))
    }

    pub fn render_all(&self, result: &mut CompileResult, nodes: &[Node]) -> Result<(), CompileError> {
        nodes.iter().try_for_each(|node| self.render(result, node))
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("renderers", &self.renderers.len())
            .finish()
    }
}
