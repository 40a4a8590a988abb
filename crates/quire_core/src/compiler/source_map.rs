use std::collections::HashMap;

use quire_lexer::Position;
use serde::{Deserialize, Serialize};

use super::result::Fragment;
use crate::loader::Loader;

/// Origin of a compiled line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMapping {
    /// Index into [`SourceMap::paths`].
    pub path: usize,
    /// Template line, 1-indexed.
    pub line: u32,
}

/// Per-line map from compiled output to template source.
///
/// `lines[n]` describes compiled line `n + 1`. Lines produced only by
/// synthetic nodes have no mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    paths: Vec<String>,
    lines: Vec<Option<LineMapping>>,
}

impl SourceMap {
    /// Builds the map from rendered fragments.
    ///
    /// A line maps to the first fragment with a known origin that writes
    /// to it. Newlines inside a fragment advance the template line as well.
    pub fn calculate(fragments: &[Fragment], loader: &dyn Loader) -> Self {
        let mut map = Self::default();
        let mut sources: HashMap<String, Option<String>> = HashMap::new();
        let mut line = 0usize;

        for fragment in fragments {
            let origin = fragment.context.as_ref().and_then(|context| {
                let path = context.path()?;
                let offset = context.offset()?;
                let source = sources
                    .entry(path.to_string())
                    .or_insert_with(|| loader.load(path).ok().map(|s| s.content))
                    .as_deref()?;
                Some((path, Position::from_offset(source, offset).line))
            });

            let origin = origin.map(|(path, source_line)| (map.path_index(path), source_line));

            for (index, segment) in fragment.content.split('\n').enumerate() {
                if index > 0 {
                    line += 1;
                }
                if map.lines.len() <= line {
                    map.lines.resize(line + 1, None);
                }
                if segment.is_empty() || map.lines[line].is_some() {
                    continue;
                }
                if let Some((path, source_line)) = origin {
                    map.lines[line] = Some(LineMapping {
                        path,
                        line: source_line + index as u32,
                    });
                }
            }
        }

        map
    }

    fn path_index(&mut self, path: &str) -> usize {
        match self.paths.iter().position(|p| p == path) {
            Some(index) => index,
            None => {
                self.paths.push(path.to_string());
                self.paths.len() - 1
            }
        }
    }

    /// Template path and line of compiled line `line` (1-indexed).
    pub fn lookup(&self, line: u32) -> Option<(&str, u32)> {
        let index = usize::try_from(line).ok()?.checked_sub(1)?;
        let mapping = self.lines.get(index).copied().flatten()?;
        Some((self.paths.get(mapping.path)?.as_str(), mapping.line))
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Number of compiled lines covered.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
