//! HTML tags, attributes and verbatim element bodies.

use crate::buffer::Buffer;
use crate::error::ScannerError;
use crate::grammar::{Grammar, is_keyword_char, pack_token};
use crate::token::{Byte, GrammarId, Item, Token, TokenKind};

/// Elements whose content is never parsed for nested tags.
const VERBATIM_TAGS: [&str; 3] = ["script", "canvas", "style"];

/// Tokenizes HTML tags.
///
/// Only the tags themselves become tokens; text between tags is passed
/// through. A `<` which does not start a well formed tag is emitted as plain
/// content and the scanner resumes right after it.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlGrammar;

impl HtmlGrammar {
    pub const ID: GrammarId = GrammarId::new("html");

    pub const KEYWORD: TokenKind = TokenKind(1);
    pub const OPEN: TokenKind = TokenKind(2);
    pub const OPEN_SHORT: TokenKind = TokenKind(3);
    pub const CLOSE: TokenKind = TokenKind(4);
    pub const CLOSE_SHORT: TokenKind = TokenKind(5);
    pub const EQUAL: TokenKind = TokenKind(6);
    pub const ATTRIBUTE: TokenKind = TokenKind(7);
    pub const WHITESPACE: TokenKind = TokenKind(9);
    pub const VERBATIM: TokenKind = TokenKind(10);

    /// Reads the body of a verbatim element up to its closing tag.
    fn scan_verbatim(&self, src: &mut Buffer<'_>, name: &str, out: &mut Vec<Item>) {
        let mut chunks: Vec<Item> = Vec::new();

        while let Some(item) = src.next() {
            let byte = match item {
                Item::Byte(byte) => byte,
                token => {
                    chunks.push(token);
                    continue;
                }
            };

            match byte.ch {
                '"' | '\'' | '`' => {
                    chunks.push(Item::Byte(byte));
                    skip_string(src, byte.ch, &mut chunks);
                }
                '/' if matches!(src.lookahead_byte(1).as_str(), "/" | "*") => {
                    let multiline = src.lookahead_byte(1) == "*";
                    chunks.push(Item::Byte(byte));
                    chunks.extend(src.next());

                    while let Some(item) = src.next() {
                        match item {
                            Item::Byte(lt) if lt.ch == '<' => {
                                if let Some(tag) = closing_tag(src, lt, name) {
                                    flush_verbatim(chunks, tag, out);
                                    return;
                                }
                                chunks.push(item);
                            }
                            Item::Byte(star)
                                if multiline && star.ch == '*' && src.lookahead_byte(1) == "/" =>
                            {
                                chunks.push(item);
                                chunks.extend(src.next());
                                break;
                            }
                            Item::Byte(newline) if !multiline && newline.ch == '\n' => {
                                chunks.push(item);
                                break;
                            }
                            _ => chunks.push(item),
                        }
                    }
                }
                '<' => {
                    if let Some(tag) = closing_tag(src, byte, name) {
                        flush_verbatim(chunks, tag, out);
                        return;
                    }
                    chunks.push(Item::Byte(byte));
                }
                _ => chunks.push(Item::Byte(byte)),
            }
        }

        // unterminated element, keep the content for the parser to report
        if !chunks.is_empty() {
            out.push(Item::Token(pack_token(chunks, Self::VERBATIM, Self::ID)));
        }
    }
}

impl Grammar for HtmlGrammar {
    fn id(&self) -> GrammarId {
        Self::ID
    }

    fn parse(&self, src: &mut Buffer<'_>) -> Result<Vec<Item>, ScannerError> {
        let mut out = Vec::new();

        while let Some(item) = src.next() {
            let lt = match item {
                Item::Byte(byte) if byte.ch == '<' => byte,
                other => {
                    out.push(other);
                    continue;
                }
            };

            let Some(tag) = TagScanner::new(lt.offset).scan(src) else {
                out.push(Item::Byte(lt));
                src.replay(lt.offset);
                continue;
            };

            let name = tag_name(&tag);
            let verbatim = tag[0].kind == Self::OPEN
                && tag.last().is_some_and(|t| t.kind == Self::CLOSE)
                && VERBATIM_TAGS.contains(&name.as_str());

            out.extend(tag.into_iter().map(Item::Token));
            if verbatim {
                self.scan_verbatim(src, &name, &mut out);
            }
        }

        Ok(out)
    }

    fn token_name(&self, kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::RAW => "HTML:RAW",
            Self::KEYWORD => "HTML:KEYWORD",
            Self::OPEN => "HTML:OPEN_TAG",
            Self::OPEN_SHORT => "HTML:OPEN_SHORT_TAG",
            Self::CLOSE => "HTML:CLOSE_TAG",
            Self::CLOSE_SHORT => "HTML:CLOSE_SHORT_TAG",
            Self::EQUAL => "HTML:EQUAL",
            Self::ATTRIBUTE => "HTML:ATTRIBUTE",
            Self::WHITESPACE => "HTML:WHITESPACE",
            Self::VERBATIM => "HTML:VERBATIM",
            _ => "HTML:UNDEFINED",
        }
    }
}

/// Scanner state for a single tag attempt.
struct TagScanner {
    tokens: Vec<Token>,
    whitespace: Vec<Item>,
    keyword: Vec<Item>,
    attribute: Vec<Item>,
}

impl TagScanner {
    fn new(offset: usize) -> Self {
        Self {
            tokens: vec![Token::new(HtmlGrammar::OPEN, Some(offset), "<").with_grammar(HtmlGrammar::ID)],
            whitespace: Vec::new(),
            keyword: Vec::new(),
            attribute: Vec::new(),
        }
    }

    /// Scans the rest of a tag whose `<` was already consumed.
    ///
    /// Returns `None` when the input does not form a valid tag; the caller is
    /// responsible for rewinding the buffer.
    fn scan(mut self, src: &mut Buffer<'_>) -> Option<Vec<Token>> {
        if src.lookahead_byte(1) == "/" {
            self.tokens[0].kind = HtmlGrammar::OPEN_SHORT;
            self.tokens[0].content.push('/');
            src.next();
        }

        while let Some(item) = src.next() {
            if let Some(quote) = self.attribute.first().and_then(Item::as_char) {
                let closes = item.is_char(quote);
                self.attribute.push(item);
                if closes {
                    self.flush_attribute();
                }
                continue;
            }

            let byte = match item {
                Item::Byte(byte) => byte,
                token => {
                    self.flush_whitespace();
                    self.keyword.push(token);
                    continue;
                }
            };

            match byte.ch {
                '"' | '\'' | '`' => {
                    self.flush();
                    self.attribute.push(Item::Byte(byte));
                }
                '=' => {
                    self.flush();
                    self.push(HtmlGrammar::EQUAL, byte.offset, "=");
                }
                '/' => {
                    if src.lookahead_byte(1) != ">" {
                        return None;
                    }
                    self.flush();
                    src.next();
                    self.push(HtmlGrammar::CLOSE_SHORT, byte.offset, "/>");
                    break;
                }
                '>' => {
                    self.flush();
                    self.push(HtmlGrammar::CLOSE, byte.offset, ">");
                    break;
                }
                ch if ch.is_whitespace() => {
                    self.flush_keyword();
                    self.whitespace.push(Item::Byte(byte));
                }
                ch => {
                    self.flush_whitespace();
                    if !is_keyword_char(ch) {
                        return None;
                    }
                    self.keyword.push(Item::Byte(byte));
                }
            }
        }

        self.is_valid().then_some(self.tokens)
    }

    fn is_valid(&self) -> bool {
        if self.tokens.len() < 3 {
            return false;
        }

        let closed = self
            .tokens
            .last()
            .is_some_and(|t| t.kind == HtmlGrammar::CLOSE || t.kind == HtmlGrammar::CLOSE_SHORT);
        if !closed {
            return false;
        }

        // name keyword must come before any attribute value
        for token in &self.tokens[1..] {
            match token.kind {
                HtmlGrammar::WHITESPACE => continue,
                HtmlGrammar::KEYWORD => return true,
                _ => return false,
            }
        }

        false
    }

    fn push(&mut self, kind: TokenKind, offset: usize, content: &str) {
        self.tokens
            .push(Token::new(kind, Some(offset), content).with_grammar(HtmlGrammar::ID));
    }

    fn flush(&mut self) {
        self.flush_whitespace();
        self.flush_keyword();
    }

    fn flush_whitespace(&mut self) {
        if !self.whitespace.is_empty() {
            let inner = std::mem::take(&mut self.whitespace);
            self.tokens
                .push(pack_token(inner, HtmlGrammar::WHITESPACE, HtmlGrammar::ID));
        }
    }

    fn flush_keyword(&mut self) {
        if !self.keyword.is_empty() {
            let inner = std::mem::take(&mut self.keyword);
            self.tokens
                .push(pack_token(inner, HtmlGrammar::KEYWORD, HtmlGrammar::ID));
        }
    }

    fn flush_attribute(&mut self) {
        if !self.attribute.is_empty() {
            let inner = std::mem::take(&mut self.attribute);
            self.tokens
                .push(pack_token(inner, HtmlGrammar::ATTRIBUTE, HtmlGrammar::ID));
        }
    }
}

fn tag_name(tag: &[Token]) -> String {
    tag.iter()
        .find(|t| t.kind == HtmlGrammar::KEYWORD)
        .map(|t| t.content.to_lowercase())
        .unwrap_or_default()
}

/// Tries to read the closing tag of a verbatim element at `lt`.
///
/// Rewinds the buffer to just after `lt` when anything else is found.
fn closing_tag(src: &mut Buffer<'_>, lt: Byte, name: &str) -> Option<Vec<Token>> {
    match TagScanner::new(lt.offset).scan(src) {
        Some(tag) if tag[0].kind == HtmlGrammar::OPEN_SHORT && tag_name(&tag) == name => Some(tag),
        _ => {
            src.replay(lt.offset);
            None
        }
    }
}

fn skip_string(src: &mut Buffer<'_>, quote: char, chunks: &mut Vec<Item>) {
    while let Some(item) = src.next() {
        let ch = item.as_char();
        chunks.push(item);
        match ch {
            Some('\\') => chunks.extend(src.next()),
            Some(ch) if ch == quote => break,
            _ => {}
        }
    }
}

fn flush_verbatim(chunks: Vec<Item>, tag: Vec<Token>, out: &mut Vec<Item>) {
    if !chunks.is_empty() {
        out.push(Item::Token(pack_token(
            chunks,
            HtmlGrammar::VERBATIM,
            HtmlGrammar::ID,
        )));
    }
    out.extend(tag.into_iter().map(Item::Token));
}
