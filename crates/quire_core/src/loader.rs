//! Template source loaders.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors returned by a [`Loader`].
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No template exists under the path.
    #[error("Template `{0}` not found")]
    NotFound(String),

    /// The path is malformed or escapes the template root.
    #[error("Invalid template path `{0}`")]
    InvalidPath(String),

    /// The template exists but could not be read.
    #[error("Failed to read template `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl LoaderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Raw template text with its logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Normalized logical path, such as `layout/base`.
    pub path: String,
    pub content: String,
    /// File the content was read from, if any.
    pub filename: Option<PathBuf>,
}

impl Source {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            filename: None,
        }
    }
}

/// Provides template text by logical path.
pub trait Loader {
    fn load(&self, path: &str) -> Result<Source, LoaderError>;

    /// Returns true when `path` can be loaded.
    fn exists(&self, path: &str) -> bool {
        self.load(path).is_ok()
    }
}

/// Normalizes a logical template path.
///
/// Separators become `/`, a trailing `.{extension}` is dropped and remaining
/// dots are read as separators, so `layout.base`, `layout/base` and
/// `layout/base.html` all name the same template. Absolute paths and `..`
/// segments are rejected.
pub fn normalize_path(path: &str, extension: &str) -> Result<String, LoaderError> {
    let invalid = || LoaderError::InvalidPath(path.to_string());

    let mut normalized = path.trim().replace('\\', "/");
    if !extension.is_empty()
        && let Some(stripped) = normalized.strip_suffix(&format!(".{extension}"))
    {
        normalized = stripped.to_string();
    }

    if normalized.starts_with('/') {
        return Err(invalid());
    }

    let mut segments = Vec::new();
    for segment in normalized.split(['/', '.']) {
        match segment {
            "" if segments.is_empty() => return Err(invalid()),
            "" => {}
            _ => segments.push(segment),
        }
    }

    // `..` collapses into two empty segments above, so only check the text
    if segments.is_empty() || normalized.contains("..") {
        return Err(invalid());
    }

    Ok(segments.join("/"))
}

/// In-memory loader, mostly used in tests.
#[derive(Debug, Default, Clone)]
pub struct StringLoader {
    templates: HashMap<String, String>,
}

impl StringLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, path: &str, content: impl Into<String>) -> Self {
        self.add(path, content);
        self
    }

    pub fn add(&mut self, path: &str, content: impl Into<String>) {
        let key = normalize_path(path, "").unwrap_or_else(|_| path.to_string());
        self.templates.insert(key, content.into());
    }
}

impl Loader for StringLoader {
    fn load(&self, path: &str) -> Result<Source, LoaderError> {
        let path = normalize_path(path, "")?;
        self.templates
            .get(&path)
            .map(|content| Source::new(path.clone(), content.clone()))
            .ok_or(LoaderError::NotFound(path))
    }

    fn exists(&self, path: &str) -> bool {
        normalize_path(path, "").is_ok_and(|path| self.templates.contains_key(&path))
    }
}

/// Loads `{root}/{path}.{extension}` files.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
    extension: String,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a logical path to its file.
    pub fn filename(&self, path: &str) -> Result<PathBuf, LoaderError> {
        let path = normalize_path(path, &self.extension)?;
        let mut filename = self.root.join(&path);
        if !self.extension.is_empty() {
            filename.set_extension(&self.extension);
        }
        Ok(filename)
    }

    /// Logical path of a file under the root, if it is a template.
    pub fn logical_path(&self, filename: &Path) -> Option<String> {
        let relative = filename.strip_prefix(&self.root).ok()?;
        if !self.extension.is_empty()
            && relative.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str())
        {
            return None;
        }

        let stem = relative.with_extension("");
        let segments: Vec<&str> = stem
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;
        Some(segments.join("/"))
    }
}

impl Loader for DirectoryLoader {
    fn load(&self, path: &str) -> Result<Source, LoaderError> {
        let logical = normalize_path(path, &self.extension)?;
        let filename = self.filename(&logical)?;

        let content = fs::read_to_string(&filename).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoaderError::NotFound(logical.clone()),
            _ => LoaderError::Io {
                path: logical.clone(),
                source,
            },
        })?;

        Ok(Source {
            path: logical,
            content,
            filename: Some(filename),
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.filename(path).is_ok_and(|f| f.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case("layout", "layout")]
    #[case("layout.base", "layout/base")]
    #[case("layout/base", "layout/base")]
    #[case("layout/base.html", "layout/base")]
    #[case("layout\\base", "layout/base")]
    #[case(" home ", "home")]
    fn test_normalize_path(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(normalize_path(path, "html").unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("/etc/passwd")]
    #[case("../secret")]
    #[case("a/../../b")]
    #[case(".hidden")]
    fn test_normalize_path_rejects(#[case] path: &str) {
        assert!(matches!(
            normalize_path(path, "html"),
            Err(LoaderError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_string_loader() {
        let loader = StringLoader::new().with("layout/base", "<html/>");

        let source = loader.load("layout.base").unwrap();
        assert_eq!(source.path, "layout/base");
        assert_eq!(source.content, "<html/>");
        assert!(loader.exists("layout/base"));
        assert!(!loader.exists("missing"));
        assert!(loader.load("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_directory_loader() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("layout")).unwrap();
        fs::write(dir.path().join("layout/base.html"), "<b>base</b>").unwrap();

        let loader = DirectoryLoader::new(dir.path(), "html");
        let source = loader.load("layout.base").unwrap();
        assert_eq!(source.path, "layout/base");
        assert_eq!(source.content, "<b>base</b>");
        assert_eq!(source.filename, Some(dir.path().join("layout/base.html")));

        assert!(loader.exists("layout/base"));
        assert!(!loader.exists("layout/missing"));
        assert!(loader.load("layout/missing").unwrap_err().is_not_found());
        assert!(matches!(
            loader.load("../outside"),
            Err(LoaderError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_logical_path() {
        let loader = DirectoryLoader::new("/views", "html");
        assert_eq!(
            loader.logical_path(Path::new("/views/layout/base.html")).as_deref(),
            Some("layout/base")
        );
        assert_eq!(loader.logical_path(Path::new("/views/readme.md")), None);
        assert_eq!(loader.logical_path(Path::new("/other/a.html")), None);
    }
}
