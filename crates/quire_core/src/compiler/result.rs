use std::sync::Arc;

use quire_ast::Context;
use serde::Serialize;

use super::source_map::SourceMap;
use crate::loader::Loader;

/// A piece of compiled output and the node context it was rendered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub content: String,
    #[serde(skip)]
    pub context: Option<Arc<Context>>,
}

/// Compiled template: an ordered list of fragments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompileResult {
    fragments: Vec<Fragment>,
}

impl CompileResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends output. Empty content is ignored.
    pub fn push(&mut self, content: impl Into<String>, context: Option<&Arc<Context>>) {
        let content = content.into();
        if content.is_empty() {
            return;
        }
        self.fragments.push(Fragment {
            content,
            context: context.cloned(),
        });
    }

    /// The compiled source.
    pub fn content(&self) -> String {
        self.fragments.iter().map(|f| f.content.as_str()).collect()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Maps compiled lines back to template lines. Templates are read through
    /// `loader` to resolve offsets.
    pub fn source_map(&self, loader: &dyn Loader) -> SourceMap {
        SourceMap::calculate(&self.fragments, loader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_skips_empty() {
        let mut result = CompileResult::new();
        result.push("<b>", None);
        result.push("", None);
        result.push(String::from("</b>"), None);

        assert_eq!(result.fragments().len(), 2);
        assert_eq!(result.content(), "<b></b>");
    }

    #[test]
    fn test_fragment_keeps_context() {
        let context = Context::new(None, Some("home".into()));
        let mut result = CompileResult::new();
        result.push("x", Some(&context));

        let fragment = &result.fragments()[0];
        assert!(fragment.context.as_ref().is_some_and(|c| Arc::ptr_eq(c, &context)));
    }
}
