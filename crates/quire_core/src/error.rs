//! Compile error types.

use std::fmt;
use std::sync::Arc;

use quire_ast::Context;
use quire_lexer::Position;
use quire_parser::ParserError;
use serde::Serialize;
use thiserror::Error;

use crate::loader::LoaderError;

/// Resolved source position of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: Option<String>,
    pub offset: usize,
    pub line: u32,
    pub column: u32,
    /// Full source line containing the offset.
    pub excerpt: String,
}

impl Location {
    pub fn resolve(source: &str, path: Option<&str>, offset: usize) -> Self {
        let position = Position::from_offset(source, offset);
        Self {
            path: path.map(str::to_string),
            offset,
            line: position.line,
            column: position.column,
            excerpt: Position::line_text(source, offset).to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.path.as_deref().unwrap_or("<inline>"),
            self.line,
            self.column
        )
    }
}

/// Message and origin of a located error.
#[derive(Debug, Clone, Default)]
pub struct Fault {
    pub message: String,
    pub context: Option<Arc<Context>>,
    pub location: Option<Location>,
}

impl Fault {
    pub fn new(message: impl Into<String>, context: Option<Arc<Context>>) -> Self {
        Self {
            message: message.into(),
            context,
            location: None,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
            if !location.excerpt.trim().is_empty() {
                write!(f, "\n    {}", location.excerpt.trim_end())?;
            }
        }
        Ok(())
    }
}

/// Errors raised while compiling a template. Every error aborts the compile.
#[derive(Debug, Error)]
pub enum CompileError {
    /// A grammar layer could not tokenize the template.
    #[error("Scanner error: {0}")]
    Scanner(Fault),

    /// The tokens do not form a valid template.
    #[error("Syntax error: {0}")]
    Syntax(Fault),

    /// A directive is unknown or malformed.
    #[error("Directive error: {0}")]
    Directive(Fault),

    /// An import could not be resolved.
    #[error("Import error: {fault}")]
    Import {
        fault: Fault,
        #[source]
        source: Option<Box<CompileError>>,
    },

    /// A parent template could not be extended.
    #[error("Extends error: {fault}")]
    Extends {
        fault: Fault,
        #[source]
        source: Option<Box<CompileError>>,
    },

    /// The template is well formed but inconsistent.
    #[error("Logic error: {0}")]
    Logic(Fault),

    /// A node could not be rendered.
    #[error("Render error: {0}")]
    Render(Fault),

    /// A template could not be loaded.
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CompileError {
    pub fn syntax(message: impl Into<String>, context: Option<Arc<Context>>) -> Self {
        Self::Syntax(Fault::new(message, context))
    }

    pub fn directive(message: impl Into<String>, context: Option<Arc<Context>>) -> Self {
        Self::Directive(Fault::new(message, context))
    }

    pub fn logic(message: impl Into<String>, context: Option<Arc<Context>>) -> Self {
        Self::Logic(Fault::new(message, context))
    }

    pub fn render(message: impl Into<String>, context: Option<Arc<Context>>) -> Self {
        Self::Render(Fault::new(message, context))
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an import error caused by `source`.
    pub fn import(
        message: impl Into<String>,
        context: Option<Arc<Context>>,
        source: Option<CompileError>,
    ) -> Self {
        Self::Import {
            fault: Fault::new(message, context),
            source: source.map(Box::new),
        }
    }

    /// Creates an extends error caused by `source`.
    pub fn extends(
        message: impl Into<String>,
        context: Option<Arc<Context>>,
        source: Option<CompileError>,
    ) -> Self {
        Self::Extends {
            fault: Fault::new(message, context),
            source: source.map(Box::new),
        }
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Scanner(fault)
            | Self::Syntax(fault)
            | Self::Directive(fault)
            | Self::Logic(fault)
            | Self::Render(fault)
            | Self::Import { fault, .. }
            | Self::Extends { fault, .. } => Some(fault),
            Self::Loader(_) | Self::Config(_) => None,
        }
    }

    fn fault_mut(&mut self) -> Option<&mut Fault> {
        match self {
            Self::Scanner(fault)
            | Self::Syntax(fault)
            | Self::Directive(fault)
            | Self::Logic(fault)
            | Self::Render(fault)
            | Self::Import { fault, .. }
            | Self::Extends { fault, .. } => Some(fault),
            Self::Loader(_) | Self::Config(_) => None,
        }
    }

    /// Context of the failure point.
    pub fn context(&self) -> Option<&Arc<Context>> {
        self.fault().and_then(|fault| fault.context.as_ref())
    }

    pub fn location(&self) -> Option<&Location> {
        self.fault().and_then(|fault| fault.location.as_ref())
    }

    /// Resolves the location of the error within `source`, which must be the
    /// text of the template the error context points at.
    #[must_use]
    pub fn locate(mut self, source: &str) -> Self {
        if let Some(fault) = self.fault_mut()
            && fault.location.is_none()
            && let Some(offset) = fault.context.as_ref().and_then(|c| c.offset())
        {
            let path = fault.context.as_ref().and_then(|c| c.path());
            fault.location = Some(Location::resolve(source, path, offset));
        }
        self
    }

    /// Resolves the location of the error and of every wrapped cause.
    /// `lookup` returns the text of a template by path.
    #[must_use]
    pub fn locate_with(self, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let err = match self {
            Self::Import { fault, source } => Self::Import {
                fault,
                source: source.map(|s| Box::new(s.locate_with(lookup))),
            },
            Self::Extends { fault, source } => Self::Extends {
                fault,
                source: source.map(|s| Box::new(s.locate_with(lookup))),
            },
            other => other,
        };

        let text = err.context().and_then(|c| c.path()).and_then(lookup);
        match text {
            Some(text) => err.locate(&text),
            None => err,
        }
    }
}

impl From<ParserError> for CompileError {
    fn from(err: ParserError) -> Self {
        let context = err.context();
        match err {
            ParserError::Scanner { source, .. } => {
                Self::Scanner(Fault::new(source.message, context))
            }
            other => Self::Syntax(Fault::new(other.to_string(), context)),
        }
    }
}
