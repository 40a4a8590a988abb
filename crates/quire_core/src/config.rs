//! Compiler configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use jsonc_parser::ParseOptions;
use jsonschema::Validator;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

// Embed the schema
const SCHEMA_JSON: &str = include_str!("../../../schemas/v1/config.json");
static CONFIG_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Configuration file names, in lookup order.
pub const CONFIG_FILES: [&str; 2] = [".quire.jsonc", ".quire.json"];

/// Default wrapping of `{{ }}` output.
pub const ESCAPED_FILTER: &str =
    "<?php echo htmlspecialchars((string) %s, ENT_QUOTES | ENT_SUBSTITUTE, 'utf-8'); ?>";

/// Default wrapping of `{!! !!}` output.
pub const RAW_FILTER: &str = "<?php echo %s; ?>";

/// A directive family available to templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveFamily {
    /// `@if`, `@unless`, `@isset`, `@empty`, `@switch` and friends.
    Conditional,
    /// `@foreach`, `@for`, `@while`, `@break`, `@continue`.
    Loop,
    /// `@json`.
    Json,
    /// `@php` passthrough.
    Php,
}

/// Configuration for the compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Template root directory.
    #[serde(default = "default_root")]
    pub root: String,

    /// Template file extension.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Templates to compile in batch mode.
    #[serde(default)]
    pub include: Vec<String>,

    /// Templates to skip in batch mode.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Output directory of compiled templates.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Wrapping of escaped output.
    #[serde(default = "default_escaped_filter")]
    pub escaped_filter: String,

    /// Wrapping of raw output.
    #[serde(default = "default_raw_filter")]
    pub raw_filter: String,

    /// Named wrappings selected by a `|name` annotation on output.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,

    /// Directive families, in lookup order.
    #[serde(default = "default_directives")]
    pub directives: Vec<DirectiveFamily>,

    /// Fail on unknown directives instead of keeping them as text.
    #[serde(default = "default_strict_directives")]
    pub strict_directives: bool,

    /// Drop whitespace-only text from compiled output.
    #[serde(default)]
    pub trim_whitespace: bool,

    /// Base directory for resolving relative paths.
    /// This is usually the directory containing the configuration file.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_extension() -> String {
    "html".to_string()
}

fn default_out_dir() -> String {
    "compiled".to_string()
}

fn default_escaped_filter() -> String {
    ESCAPED_FILTER.to_string()
}

fn default_raw_filter() -> String {
    RAW_FILTER.to_string()
}

fn default_directives() -> Vec<DirectiveFamily> {
    vec![
        DirectiveFamily::Conditional,
        DirectiveFamily::Loop,
        DirectiveFamily::Json,
        DirectiveFamily::Php,
    ]
}

fn default_strict_directives() -> bool {
    true
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self {
            root: default_root(),
            extension: default_extension(),
            include: Vec::new(),
            exclude: Vec::new(),
            out_dir: default_out_dir(),
            escaped_filter: default_escaped_filter(),
            raw_filter: default_raw_filter(),
            filters: BTreeMap::new(),
            directives: default_directives(),
            strict_directives: default_strict_directives(),
            trim_whitespace: false,
            base_dir: None,
        }
    }

    /// Finds the configuration file in `dir`.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Loads configuration from a file.
    ///
    /// Supports `.quire.jsonc`, `.quire.json`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CompileError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| CompileError::config(format!("Failed to read config: {}", e)))?;

        let mut config = Self::from_json(&content)?;

        if let Some(parent) = path.parent() {
            config.base_dir = Some(parent.to_path_buf());
        }

        Ok(config)
    }

    /// Parses configuration from a JSON string (comments allowed) with
    /// schema validation.
    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        let value = jsonc_parser::parse_to_serde_value(json, &ParseOptions::default())
            .map_err(|e| CompileError::config(format!("Invalid JSON: {}", e)))?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        let schema = CONFIG_SCHEMA.get_or_init(|| {
            let schema_json: serde_json::Value =
                serde_json::from_str(SCHEMA_JSON).expect("Invalid embedded config schema");
            Validator::new(&schema_json).expect("Invalid config schema compilation")
        });

        if let Err(e) = schema.validate(&value) {
            let error_msg = format!("{} at {}", e, e.instance_path());
            return Err(CompileError::config(format!(
                "Config validation failed: {}",
                error_msg
            )));
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|e| CompileError::config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks constraints the schema cannot express.
    pub fn validate(&self) -> Result<(), CompileError> {
        let named = self
            .filters
            .iter()
            .map(|(name, filter)| (format!("filters.{name}"), filter));
        let builtin = [
            ("escaped_filter".to_string(), &self.escaped_filter),
            ("raw_filter".to_string(), &self.raw_filter),
        ];

        for (key, filter) in builtin.into_iter().chain(named) {
            if filter.matches("%s").count() != 1 {
                return Err(CompileError::config(format!(
                    "`{key}` must contain exactly one `%s` placeholder"
                )));
            }
        }
        Ok(())
    }

    /// Template root resolved against the configuration directory.
    pub fn root_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(&self.root),
            None => PathBuf::from(&self.root),
        }
    }

    /// Output directory resolved against the configuration directory.
    pub fn out_path(&self) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(&self.out_dir),
            None => PathBuf::from(&self.out_dir),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new()
    }
}
