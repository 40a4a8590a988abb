//! Quire CLI
//!
//! Compiles HTML templates with components, layouts and directives into PHP.

mod cli;
mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use miette::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::ast::run_ast;
use commands::compile::run_compile;
use commands::init::run_init;
use commands::tokens::run_tokens;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Compile {
            patterns,
            out_dir,
            format,
            source_map,
        } => run_compile(cli, patterns, out_dir.as_deref(), *format, *source_map),
        Commands::Tokens { path } => {
            run_tokens(cli, path)?;
            Ok(false)
        }
        Commands::Ast { path, transformed } => {
            run_ast(cli, path, *transformed)?;
            Ok(false)
        }
        Commands::Init { force } => {
            run_init(*force)?;
            Ok(false)
        }
    }
}
