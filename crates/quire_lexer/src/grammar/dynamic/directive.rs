use crate::buffer::Buffer;
use crate::grammar::{is_keyword_char, pack_token};
use crate::token::{Item, Token, TokenKind};

use super::DynamicGrammar;

/// Outcome of a directive scan.
pub(super) enum Scan {
    Parsed(ScannedDirective),
    /// Not a directive; the `@` is plain text.
    Invalid,
    /// The body was opened but never closed before end of input.
    Unterminated(String),
}

/// Tokens of a successfully scanned `@name(body)` directive.
pub(super) struct ScannedDirective {
    tokens: Vec<Token>,
}

impl ScannedDirective {
    pub(super) fn keyword(&self) -> &str {
        self.find(DynamicGrammar::KEYWORD).unwrap_or_default()
    }

    pub(super) fn body(&self) -> Option<&str> {
        self.find(DynamicGrammar::BODY)
    }

    /// Offset of the last character belonging to the directive.
    pub(super) fn last_offset(&self) -> usize {
        self.tokens
            .last()
            .and_then(Token::last_offset)
            .unwrap_or_default()
    }

    pub(super) fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    fn find(&self, kind: TokenKind) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.content.as_str())
    }
}

/// Scanner state for a single directive attempt.
#[derive(Default)]
pub(super) struct DirectiveScanner {
    tokens: Vec<Token>,
    name: Vec<Item>,
    body: Vec<Item>,
}

impl DirectiveScanner {
    /// Scans a directive whose `@` at `offset` was already consumed.
    pub(super) fn scan(mut self, src: &mut Buffer<'_>, offset: usize) -> Scan {
        self.push(DynamicGrammar::DIRECTIVE, offset, "@");
        let mut has_whitespace = false;

        while let Some(item) = src.next() {
            let byte = match item {
                Item::Byte(byte) => byte,
                Item::Token(_) => break,
            };

            match byte.ch {
                '(' => {
                    self.flush_name();
                    self.push(DynamicGrammar::BODY_OPEN, byte.offset, "(");
                    return self.scan_body(src);
                }
                ch if ch.is_whitespace() => {
                    has_whitespace = true;
                    if !self.name.is_empty() {
                        self.flush_name();
                        self.push(DynamicGrammar::WHITESPACE, byte.offset, &ch.to_string());
                        continue;
                    }
                    match self.tokens.last_mut() {
                        Some(last) if last.kind == DynamicGrammar::WHITESPACE => {
                            last.content.push(ch);
                        }
                        _ => return Scan::Invalid,
                    }
                }
                _ if has_whitespace => return self.finalize(),
                ch if !is_keyword_char(ch) => {
                    self.flush_name();
                    return self.finalize();
                }
                _ => self.name.push(item),
            }
        }

        self.flush_name();
        self.finalize()
    }

    fn scan_body(mut self, src: &mut Buffer<'_>) -> Scan {
        let mut level = 1;

        while let Some(item) = src.next() {
            let byte = match item {
                Item::Byte(byte) => byte,
                Item::Token(_) => return Scan::Invalid,
            };

            match byte.ch {
                '"' | '\'' => {
                    self.body.push(item);
                    let mut closed = false;
                    while let Some(next) = src.next() {
                        let ch = next.as_char();
                        self.body.push(next);
                        match ch {
                            Some('\\') => self.body.extend(src.next()),
                            Some(ch) if ch == byte.ch => {
                                closed = true;
                                break;
                            }
                            _ => {}
                        }
                    }
                    if !closed {
                        return Scan::Unterminated(self.keyword());
                    }
                }
                '(' => {
                    level += 1;
                    self.body.push(item);
                }
                ')' => {
                    level -= 1;
                    if level == 0 {
                        self.flush_body();
                        self.push(DynamicGrammar::BODY_CLOSE, byte.offset, ")");
                        return self.finalize();
                    }
                    self.body.push(item);
                }
                _ => self.body.push(item),
            }
        }

        Scan::Unterminated(self.keyword())
    }

    /// Drops trailing whitespace and validates the collected tokens.
    fn finalize(mut self) -> Scan {
        while self
            .tokens
            .last()
            .is_some_and(|t| t.kind == DynamicGrammar::WHITESPACE)
        {
            self.tokens.pop();
        }

        let has_keyword = self.tokens.iter().any(|t| t.kind == DynamicGrammar::KEYWORD);
        let opened = self.count(DynamicGrammar::BODY_OPEN);
        let closed = self.count(DynamicGrammar::BODY_CLOSE);

        if !has_keyword || opened != closed {
            return Scan::Invalid;
        }

        Scan::Parsed(ScannedDirective {
            tokens: self.tokens,
        })
    }

    fn keyword(&self) -> String {
        self.tokens
            .iter()
            .find(|t| t.kind == DynamicGrammar::KEYWORD)
            .map(|t| t.content.clone())
            .unwrap_or_default()
    }

    fn count(&self, kind: TokenKind) -> usize {
        self.tokens.iter().filter(|t| t.kind == kind).count()
    }

    fn push(&mut self, kind: TokenKind, offset: usize, content: &str) {
        self.tokens
            .push(Token::new(kind, Some(offset), content).with_grammar(DynamicGrammar::ID));
    }

    fn flush_name(&mut self) {
        if !self.name.is_empty() {
            let inner = std::mem::take(&mut self.name);
            self.tokens
                .push(pack_token(inner, DynamicGrammar::KEYWORD, DynamicGrammar::ID));
        }
    }

    fn flush_body(&mut self) {
        if !self.body.is_empty() {
            let inner = std::mem::take(&mut self.body);
            self.tokens
                .push(pack_token(inner, DynamicGrammar::BODY, DynamicGrammar::ID));
        }
    }
}
