//! # quire_core
//!
//! Template builder for Quire.
//!
//! This crate provides:
//! - The [`Builder`], which loads templates, runs the transform stages and
//!   renders the result
//! - Template [loaders](Loader)
//! - Configuration loading
//! - Directive and node renderers
//! - Source maps of compiled output
//!
//! ## Example
//!
//! ```rust
//! use quire_core::{Builder, CompilerConfig, StringLoader};
//!
//! let loader = StringLoader::new()
//!     .with("layout", "<html><block:title>Default</block:title><block:body>x</block:body></html>")
//!     .with("home", "<extends:layout/><block:title>Hi</block:title>");
//!
//! let builder = Builder::new(loader, CompilerConfig::default());
//! let result = builder.compile("home").unwrap();
//! assert_eq!(result.content(), "<html>Hix</html>");
//! ```

mod builder;
pub mod compiler;
mod config;
pub mod directive;
mod error;
mod finder;
mod loader;
pub mod transform;

pub use builder::{Builder, CompileState};
pub use compiler::{CompileResult, Compiler, Fragment, LineMapping, Renderer, SourceMap};
pub use config::{CONFIG_FILES, CompilerConfig, DirectiveFamily, ESCAPED_FILTER, RAW_FILTER};
pub use directive::{DirectiveGroup, DirectiveRenderer};
pub use error::{CompileError, Fault, Location};
pub use finder::TemplateFinder;
pub use loader::{DirectoryLoader, Loader, LoaderError, Source, StringLoader, normalize_path};
