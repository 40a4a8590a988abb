//! Character source for the first lexer layer.

use crate::token::{Byte, Item};

/// Reads template text one character at a time.
#[derive(Debug, Clone)]
pub struct StringStream<'s> {
    source: &'s str,
    offset: usize,
}

impl<'s> StringStream<'s> {
    /// Creates a stream positioned at the first character.
    pub fn new(source: &'s str) -> Self {
        Self { source, offset: 0 }
    }

    /// Byte offset of the next character.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the next character and advances past it.
    pub fn peek(&mut self) -> Option<char> {
        let ch = self.source[self.offset..].chars().next()?;
        self.offset += ch.len_utf8();
        Some(ch)
    }

    /// Returns true once every character has been read.
    #[inline]
    pub fn is_eoi(&self) -> bool {
        self.offset >= self.source.len()
    }
}

impl Iterator for StringStream<'_> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        let offset = self.offset;
        self.peek().map(|ch| Item::Byte(Byte::new(offset, ch)))
    }
}
