//! Template builder.

use std::cell::{Cell, RefCell};

use quire_ast::visitor::Traverser;
use quire_ast::{Node, Template};
use quire_lexer::grammar::DynamicGrammar;
use quire_parser::{Parser, ParserError};
use tracing::debug;

use crate::compiler::{CompileResult, Compiler};
use crate::config::CompilerConfig;
use crate::directive::DirectiveGroup;
use crate::error::CompileError;
use crate::loader::{DirectoryLoader, Loader, Source};
use crate::transform::{ExtendsParent, ResolveImports, finalize, prepare};

/// Pipeline stages of a template, logged as it moves through the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileState {
    Loaded,
    Lexed,
    Parsed,
    Transforming,
    Transformed,
    Rendered,
}

/// Loads, transforms and compiles templates.
///
/// A builder is single-threaded. It tracks the templates being loaded to
/// detect circular imports and extends, and numbers import instances. Use
/// one builder per concurrent compile.
pub struct Builder {
    /// Template source.
    loader: Box<dyn Loader>,
    config: CompilerConfig,
    parser: Parser,
    compiler: Compiler,
    /// Paths being loaded, outermost first.
    loading: RefCell<Vec<String>>,
    /// Last import instance number.
    instances: Cell<usize>,
}

impl Builder {
    /// Creates a builder reading templates through `loader`.
    pub fn new(loader: impl Loader + 'static, config: CompilerConfig) -> Self {
        let parser = if config.strict_directives {
            Parser::with_dynamic(DynamicGrammar::new())
        } else {
            let names = DirectiveGroup::from_families(&config.directives).names();
            Parser::with_dynamic(DynamicGrammar::with_directives(names))
        };
        let compiler = Compiler::from_config(&config);

        Self {
            loader: Box::new(loader),
            config,
            parser,
            compiler,
            loading: RefCell::new(Vec::new()),
            instances: Cell::new(0),
        }
    }

    /// Creates a builder reading templates from the configured root.
    pub fn from_config(config: CompilerConfig) -> Self {
        let loader = DirectoryLoader::new(config.root_dir(), config.extension.clone());
        Self::new(loader, config)
    }

    pub fn loader(&self) -> &dyn Loader {
        self.loader.as_ref()
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn exists(&self, path: &str) -> bool {
        self.loader.exists(path)
    }

    /// Returns a number unique to this builder, used to tell import
    /// instances apart.
    pub fn next_instance(&self) -> usize {
        let next = self.instances.get() + 1;
        self.instances.set(next);
        next
    }

    /// Lexes and parses a source without transforming it.
    pub fn parse(&self, source: &Source) -> Result<Template, CompileError> {
        let path = Some(source.path.as_str());

        let tokens = self
            .parser
            .lexer()
            .parse(&source.content)
            .map_err(|e| ParserError::scanner(e, path))?;
        debug!(path = %source.path, state = ?CompileState::Lexed, tokens = tokens.len());

        let template = self.parser.assemble(tokens, path)?;
        debug!(path = %source.path, state = ?CompileState::Parsed, nodes = template.nodes.len());
        Ok(template)
    }

    /// Loads a template and runs every transform stage on it.
    ///
    /// Imported and extended templates are loaded recursively through the
    /// same builder.
    pub fn load(&self, path: &str) -> Result<Template, CompileError> {
        let source = self.loader.load(path)?;
        debug!(path = %source.path, state = ?CompileState::Loaded);

        if self.loading.borrow().contains(&source.path) {
            return Err(CompileError::logic(
                format!("Circular reference to template `{}`", source.path),
                None,
            ));
        }

        self.loading.borrow_mut().push(source.path.clone());
        let result = self.process(&source);
        self.loading.borrow_mut().pop();
        result
    }

    fn process(&self, source: &Source) -> Result<Template, CompileError> {
        let template = self.parse(source)?;
        let nodes = prepare(vec![template.into()])?;

        debug!(path = %source.path, state = ?CompileState::Transforming);
        let mut imports = ResolveImports::new(self);
        let mut extends = ExtendsParent::new(self);
        let nodes = Traverser::new()
            .with_visitor(&mut imports)
            .with_visitor(&mut extends)
            .traverse(nodes)?;
        let nodes = finalize(nodes, self.config.trim_whitespace)?;
        debug!(path = %source.path, state = ?CompileState::Transformed);

        match nodes.into_iter().next() {
            Some(Node::Template(template)) => Ok(template),
            _ => Err(CompileError::logic(
                format!("Template `{}` was removed by a transform", source.path),
                None,
            )),
        }
    }

    /// Loads and renders a template.
    ///
    /// Errors are located in the template source they point at.
    pub fn compile(&self, path: &str) -> Result<CompileResult, CompileError> {
        let result = self
            .load(path)
            .and_then(|template| self.compiler.compile(&template))
            .map_err(|e| self.locate(e))?;
        debug!(path, state = ?CompileState::Rendered, fragments = result.fragments().len());
        Ok(result)
    }

    /// Resolves the source location of an error and its causes.
    pub fn locate(&self, err: CompileError) -> CompileError {
        err.locate_with(&|path| self.loader.load(path).ok().map(|source| source.content))
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("config", &self.config)
            .field("parser", &self.parser)
            .field("loading", &self.loading)
            .finish_non_exhaustive()
    }
}
