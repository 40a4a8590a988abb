//! Replayable cursor over lexer items.

use std::collections::VecDeque;
use std::fmt;

use crate::token::Item;

/// Pull-based cursor over the output of a previous lexer layer.
///
/// Every item pulled from the producer is appended to an accumulation log.
/// [`Buffer::replay`] copies logged items back into a FIFO replay queue, which
/// is drained before the producer is asked for more. This lets a grammar try a
/// construct, give up, and rewind to any earlier offset without re-lexing.
pub struct Buffer<'a> {
    source: Box<dyn Iterator<Item = Item> + 'a>,
    log: Vec<Item>,
    replay: VecDeque<Item>,
    offset: usize,
}

impl<'a> Buffer<'a> {
    /// Wraps an item producer.
    pub fn new<I>(source: I) -> Self
    where
        I: IntoIterator<Item = Item>,
        I::IntoIter: 'a,
    {
        Self {
            source: Box::new(source.into_iter()),
            log: Vec::new(),
            replay: VecDeque::new(),
            offset: 0,
        }
    }

    /// Offset of the most recently consumed item that had one.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the next item without consuming it.
    pub fn lookahead(&mut self) -> Option<&Item> {
        if self.replay.is_empty() {
            let item = self.pull()?;
            self.replay.push_back(item);
        }
        self.replay.front()
    }

    /// Returns up to `size` upcoming characters without consuming them.
    ///
    /// Stops early at the first token or at end of input.
    pub fn lookahead_byte(&mut self, size: usize) -> String {
        let mut result = String::with_capacity(size);
        for index in 0..size {
            if index >= self.replay.len() {
                match self.pull() {
                    Some(item) => self.replay.push_back(item),
                    None => break,
                }
            }
            match self.replay[index].as_char() {
                Some(ch) => result.push(ch),
                None => break,
            }
        }
        result
    }

    /// Consumes consecutive characters up to the next token or end of input.
    pub fn next_bytes(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.lookahead().and_then(Item::as_char) {
            result.push(ch);
            self.next();
        }
        result
    }

    /// Rewinds the cursor so that every logged item with an offset greater
    /// than `from` is delivered again, in original order.
    pub fn replay(&mut self, from: usize) {
        let mut queue: VecDeque<Item> = self
            .replay
            .drain(..)
            .filter(|item| item.offset().is_none_or(|offset| offset <= from))
            .collect();

        queue.extend(
            self.log
                .iter()
                .filter(|item| item.offset().is_some_and(|offset| offset > from))
                .cloned(),
        );

        self.replay = queue;
    }

    fn pull(&mut self) -> Option<Item> {
        let item = self.source.next()?;
        self.log.push(item.clone());
        Some(item)
    }
}

impl Iterator for Buffer<'_> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        let item = match self.replay.pop_front() {
            Some(item) => item,
            None => self.pull()?,
        };
        if let Some(offset) = item.offset() {
            self.offset = offset;
        }
        Some(item)
    }
}

impl fmt::Debug for Buffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("offset", &self.offset)
            .field("logged", &self.log.len())
            .field("replay", &self.replay.len())
            .finish()
    }
}
