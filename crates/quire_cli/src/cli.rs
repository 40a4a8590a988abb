//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Quire - HTML template compiler
#[derive(Parser)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile templates
    Compile {
        /// Template files or glob patterns, relative to the template root.
        /// Every template is compiled when omitted.
        patterns: Vec<String>,

        /// Output directory (defaults to `out_dir` of the configuration)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write a source map next to every compiled template
        #[arg(long)]
        source_map: bool,
    },

    /// Print the tokens of a template
    Tokens {
        /// Template path
        path: String,
    },

    /// Print the syntax tree of a template as JSON
    Ast {
        /// Template path
        path: String,

        /// Print the tree after imports and extends are resolved
        #[arg(long)]
        transformed: bool,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
