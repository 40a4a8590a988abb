use crate::buffer::Buffer;
use crate::grammar::pack_token;
use crate::token::{Byte, GrammarId, Item, Token, TokenKind};

/// Delimited echo construct, such as `{{ expr }}`.
#[derive(Debug, Clone)]
pub(super) struct Braces {
    start: String,
    end: String,
    open: TokenKind,
    body: TokenKind,
    close: TokenKind,
    grammar: GrammarId,
    active: bool,
}

impl Braces {
    pub(super) fn new(
        start: &str,
        end: &str,
        [open, body, close]: [TokenKind; 3],
        grammar: GrammarId,
    ) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
            open,
            body,
            close,
            grammar,
            active: true,
        }
    }

    pub(super) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(super) fn set_start(&mut self, start: &str) {
        if !start.is_empty() {
            self.start = start.to_string();
        }
    }

    pub(super) fn set_end(&mut self, end: &str) {
        if !end.is_empty() {
            self.end = end.to_string();
        }
    }

    /// Returns true when the upcoming characters form the start sequence.
    pub(super) fn next_token(&self, src: &mut Buffer<'_>) -> bool {
        self.active && src.lookahead_byte(self.start.chars().count()) == self.start
    }

    /// Returns true when `n` and the upcoming characters form the start sequence.
    pub(super) fn starts(&self, src: &mut Buffer<'_>, n: Byte) -> bool {
        if !self.active || !self.start.starts_with(n.ch) {
            return false;
        }
        let rest = &self.start[n.ch.len_utf8()..];
        src.lookahead_byte(rest.chars().count()) == rest
    }

    /// Scans the construct whose first character `n` was already consumed.
    ///
    /// Quoted strings inside the body are skipped, so they may contain the
    /// end sequence. Returns `None` for an empty or unterminated body.
    pub(super) fn scan(&self, src: &mut Buffer<'_>, n: Byte) -> Option<Vec<Token>> {
        let mut tokens = vec![
            Token::new(self.open, Some(n.offset), self.consume(src, n, &self.start))
                .with_grammar(self.grammar),
        ];
        let mut body: Vec<Item> = Vec::new();
        let end_first = self.end.chars().next()?;

        while let Some(item) = src.next() {
            // no other grammars are allowed inside
            let byte = match item {
                Item::Byte(byte) => byte,
                Item::Token(_) => return None,
            };

            match byte.ch {
                '"' | '\'' => {
                    body.push(item);
                    while let Some(next) = src.next() {
                        let ch = next.as_char();
                        body.push(next);
                        match ch {
                            Some('\\') => body.extend(src.next()),
                            Some(ch) if ch == byte.ch => break,
                            _ => {}
                        }
                    }
                }
                ch if ch == end_first && self.ends(src, byte) => {
                    if body.is_empty() {
                        return None;
                    }
                    tokens.push(pack_token(body, self.body, self.grammar));
                    tokens.push(
                        Token::new(self.close, Some(byte.offset), self.consume(src, byte, &self.end))
                            .with_grammar(self.grammar),
                    );
                    return Some(tokens);
                }
                _ => body.push(item),
            }
        }

        None
    }

    fn ends(&self, src: &mut Buffer<'_>, n: Byte) -> bool {
        let rest = &self.end[n.ch.len_utf8()..];
        src.lookahead_byte(rest.chars().count()) == rest
    }

    /// Consumes the remainder of `sequence` after its first character `n`.
    fn consume(&self, src: &mut Buffer<'_>, n: Byte, sequence: &str) -> String {
        let mut content = n.ch.to_string();
        for _ in 1..sequence.chars().count() {
            if let Some(ch) = src.next().and_then(|item| item.as_char()) {
                content.push(ch);
            }
        }
        content
    }
}
