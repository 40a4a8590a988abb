//! Output formatting module

mod json;
mod text;

use std::error::Error;
use std::path::PathBuf;

use miette::Result;
use quire_core::{CompileError, Location};

use crate::cli::OutputFormat;

/// Result of compiling one template.
#[derive(Debug)]
pub struct Outcome {
    pub path: String,
    pub result: std::result::Result<PathBuf, Failure>,
}

/// Why a template failed to compile.
#[derive(Debug)]
pub struct Failure {
    pub message: String,
    /// Messages of wrapped errors, outermost first.
    pub causes: Vec<String>,
    pub location: Option<Location>,
}

impl From<CompileError> for Failure {
    fn from(err: CompileError) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            message: err.to_string(),
            causes,
            location: err.location().cloned(),
        }
    }
}

impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        Self {
            message: format!("Failed to write output: {err}"),
            causes: Vec::new(),
            location: None,
        }
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Self {
            message: format!("Failed to serialize source map: {err}"),
            causes: Vec::new(),
            location: None,
        }
    }
}

pub fn output_outcomes(outcomes: &[Outcome], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => json::output_json(outcomes)?,
        OutputFormat::Text => text::output_text(outcomes),
    }
    Ok(())
}
