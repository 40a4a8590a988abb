//! Line and column lookup for byte offsets.

use serde::{Deserialize, Serialize};

/// A position in template source.
///
/// Uses 1-indexed lines and 1-indexed columns, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

impl Position {
    /// Creates a new position.
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Resolves a byte offset within `source`.
    ///
    /// Offsets past the end resolve to the position right after the last
    /// character.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut column = 1;
        for (index, ch) in source.char_indices() {
            if index >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self { line, column }
    }

    /// Returns the full text of the line containing `offset`, without the
    /// line terminator.
    pub fn line_text(source: &str, offset: usize) -> &str {
        let offset = offset.min(source.len());
        let start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
        let end = source[offset..]
            .find('\n')
            .map_or(source.len(), |i| offset + i);
        source[start..end].trim_end_matches('\r')
    }
}
