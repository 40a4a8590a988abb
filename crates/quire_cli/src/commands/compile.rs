//! Compile command implementation

use std::fs;
use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result};
use quire_core::{Builder, CompilerConfig, TemplateFinder};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::load_config;
use crate::cli::{Cli, OutputFormat};
use crate::output::{Failure, Outcome, output_outcomes};

pub fn run_compile(
    cli: &Cli,
    patterns: &[String],
    out_dir: Option<&Path>,
    format: OutputFormat,
    source_map: bool,
) -> Result<bool> {
    let config = load_config(cli)?;
    let finder = TemplateFinder::from_config(&config).into_diagnostic()?;
    let templates = finder.discover(patterns).into_diagnostic()?;

    if templates.is_empty() {
        warn!("No templates found under {}", config.root_dir().display());
    }

    let out_dir = out_dir.map_or_else(|| config.out_path(), Path::to_path_buf);

    // Builders hold per-compile state, so every template gets its own.
    let outcomes: Vec<Outcome> = templates
        .par_iter()
        .map(|path| Outcome {
            path: path.clone(),
            result: compile_template(&config, path, &out_dir, source_map),
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(
        "Compiled {} of {} templates into {}",
        outcomes.len() - failed,
        outcomes.len(),
        out_dir.display()
    );

    output_outcomes(&outcomes, format)?;
    Ok(failed > 0)
}

/// Compiles one template into `{out_dir}/{path}.php`.
fn compile_template(
    config: &CompilerConfig,
    path: &str,
    out_dir: &Path,
    source_map: bool,
) -> std::result::Result<PathBuf, Failure> {
    let builder = Builder::from_config(config.clone());
    let result = builder.compile(path)?;

    let output = out_dir.join(format!("{path}.php"));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, result.content())?;
    debug!("Wrote {}", output.display());

    if source_map {
        let map = result.source_map(builder.loader());
        let map_path = out_dir.join(format!("{path}.php.map.json"));
        fs::write(&map_path, serde_json::to_string_pretty(&map)?)?;
        debug!("Wrote {}", map_path.display());
    }

    Ok(output)
}
