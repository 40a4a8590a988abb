//! Command implementations

pub mod ast;
pub mod compile;
pub mod init;
pub mod tokens;

use std::path::Path;

use miette::{IntoDiagnostic, Result};
use quire_core::CompilerConfig;
use tracing::info;

use crate::cli::Cli;

/// Loads the configuration given with `--config`, or the one found in the
/// working directory.
pub fn load_config(cli: &Cli) -> Result<CompilerConfig> {
    if let Some(ref path) = cli.config {
        return CompilerConfig::from_file(path).into_diagnostic();
    }

    if let Some(path) = CompilerConfig::find(Path::new(".")) {
        info!("Using config: {}", path.display());
        return CompilerConfig::from_file(&path).into_diagnostic();
    }

    info!("No config file found, using defaults");
    Ok(CompilerConfig::new())
}
