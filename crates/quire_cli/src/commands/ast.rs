//! Ast command implementation

use miette::{IntoDiagnostic, Result};
use quire_core::Builder;

use super::load_config;
use crate::cli::Cli;

pub fn run_ast(cli: &Cli, path: &str, transformed: bool) -> Result<()> {
    let builder = Builder::from_config(load_config(cli)?);

    let template = if transformed {
        builder.load(path)
    } else {
        builder
            .loader()
            .load(path)
            .map_err(Into::into)
            .and_then(|source| builder.parse(&source))
    };
    let template = template.map_err(|e| builder.locate(e)).into_diagnostic()?;

    println!(
        "{}",
        serde_json::to_string_pretty(&template).into_diagnostic()?
    );
    Ok(())
}
