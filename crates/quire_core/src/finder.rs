use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::info;
use walkdir::WalkDir;

use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::loader::DirectoryLoader;

/// Discovers templates under a root directory for batch compilation.
///
/// Globs are matched against paths relative to the root.
pub struct TemplateFinder {
    loader: DirectoryLoader,
    extension: String,
    include_globs: Option<GlobSet>,
    exclude_globs: Option<GlobSet>,
}

impl TemplateFinder {
    pub fn new(
        root: impl Into<PathBuf>,
        extension: &str,
        include: &[String],
        exclude: &[String],
    ) -> Result<Self, CompileError> {
        Ok(Self {
            loader: DirectoryLoader::new(root, extension),
            extension: extension.to_string(),
            include_globs: Self::build_globset(include)?,
            exclude_globs: Self::build_globset(exclude)?,
        })
    }

    pub fn from_config(config: &CompilerConfig) -> Result<Self, CompileError> {
        Self::new(
            config.root_dir(),
            &config.extension,
            &config.include,
            &config.exclude,
        )
    }

    fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>, CompileError> {
        if patterns.is_empty() {
            return Ok(None);
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| CompileError::config(format!("Invalid glob pattern: {}", e)))?;
            builder.add(glob);
        }

        let globset = builder
            .build()
            .map_err(|e| CompileError::config(format!("Failed to build globset: {}", e)))?;

        Ok(Some(globset))
    }

    /// Checks a root-relative path against the include/exclude patterns.
    pub fn should_ignore(&self, relative: &Path) -> bool {
        if self
            .exclude_globs
            .as_ref()
            .is_some_and(|excludes| excludes.is_match(relative))
        {
            return true;
        }

        self.include_globs
            .as_ref()
            .is_some_and(|includes| !includes.is_match(relative))
    }

    /// Returns the logical paths of the templates matching `patterns`.
    ///
    /// A pattern naming an existing file is taken as is; anything else is a
    /// glob. With no patterns every template under the root is returned.
    pub fn discover(&self, patterns: &[String]) -> Result<Vec<String>, CompileError> {
        let root = self.loader.root();
        let mut templates = Vec::new();

        let mut glob_builder = GlobSetBuilder::new();
        let mut has_globs = false;

        for pattern in patterns {
            let path = Path::new(pattern);
            let file = [path.to_path_buf(), root.join(path)]
                .into_iter()
                .find(|candidate| candidate.is_file());

            match file {
                Some(file) => {
                    if let Some(logical) = self.logical_path(&file) {
                        templates.push(logical);
                    }
                }
                None => {
                    let glob = Glob::new(pattern).map_err(|e| {
                        CompileError::config(format!("Invalid pattern '{}': {}", pattern, e))
                    })?;
                    glob_builder.add(glob);
                    has_globs = true;
                }
            }
        }

        if patterns.is_empty() {
            glob_builder.add(Glob::new("**/*").map_err(|e| CompileError::config(e.to_string()))?);
            has_globs = true;
        }

        if has_globs {
            let glob_set = glob_builder
                .build()
                .map_err(|e| CompileError::config(format!("Failed to build globset: {}", e)))?;

            for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                if !path.is_file() || !glob_set.is_match(relative) || self.should_ignore(relative)
                {
                    continue;
                }
                if let Some(logical) = self.loader.logical_path(path) {
                    templates.push(logical);
                }
            }
        }

        templates.sort();
        templates.dedup();

        info!("Discovered {} templates", templates.len());
        Ok(templates)
    }

    /// Logical path of an explicitly named file, resolved against the root.
    fn logical_path(&self, file: &Path) -> Option<String> {
        let root = self.loader.root().canonicalize().ok()?;
        let file = file.canonicalize().ok()?;
        let relative = file.strip_prefix(&root).ok()?;
        if self.should_ignore(relative) {
            return None;
        }
        DirectoryLoader::new(root.clone(), self.extension.as_str()).logical_path(&file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn views() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("layout")).unwrap();
        fs::create_dir_all(dir.path().join("partials")).unwrap();
        fs::write(dir.path().join("home.html"), "<b>home</b>").unwrap();
        fs::write(dir.path().join("layout/base.html"), "<html/>").unwrap();
        fs::write(dir.path().join("partials/nav.html"), "<nav/>").unwrap();
        fs::write(dir.path().join("readme.md"), "# views").unwrap();
        dir
    }

    #[test]
    fn test_build_globset_empty() {
        assert!(TemplateFinder::build_globset(&[]).unwrap().is_none());
    }

    #[test]
    fn test_build_globset_invalid_pattern() {
        assert!(TemplateFinder::build_globset(&["[invalid".to_string()]).is_err());
    }

    #[test]
    fn test_discover_all_templates() {
        let dir = views();
        let finder = TemplateFinder::new(dir.path(), "html", &[], &[]).unwrap();

        let templates = finder.discover(&[]).unwrap();
        assert_eq!(templates, vec!["home", "layout/base", "partials/nav"]);
    }

    #[test]
    fn test_discover_respects_exclude() {
        let dir = views();
        let finder =
            TemplateFinder::new(dir.path(), "html", &[], &["partials/**".to_string()]).unwrap();

        let templates = finder.discover(&["**/*.html".to_string()]).unwrap();
        assert_eq!(templates, vec!["home", "layout/base"]);
    }

    #[test]
    fn test_discover_respects_include() {
        let dir = views();
        let finder =
            TemplateFinder::new(dir.path(), "html", &["layout/**".to_string()], &[]).unwrap();

        let templates = finder.discover(&[]).unwrap();
        assert_eq!(templates, vec!["layout/base"]);
    }

    #[test]
    fn test_discover_explicit_file() {
        let dir = views();
        let finder = TemplateFinder::new(dir.path(), "html", &[], &[]).unwrap();

        let templates = finder
            .discover(&["layout/base.html".to_string(), "layout/base.html".to_string()])
            .unwrap();
        assert_eq!(templates, vec!["layout/base"]);
    }

    #[test]
    fn test_discover_invalid_glob() {
        let dir = views();
        let finder = TemplateFinder::new(dir.path(), "html", &[], &[]).unwrap();
        assert!(finder.discover(&["[invalid-glob".to_string()]).is_err());
    }
}
