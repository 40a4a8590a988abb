//! Inline block injections: `${name}` and `${name|default}`.

use crate::buffer::Buffer;
use crate::error::ScannerError;
use crate::grammar::{Grammar, is_keyword_char, pack_token};
use crate::token::{GrammarId, Item, Token, TokenKind};

/// Tokenizes `${name|default}` block placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineGrammar;

impl InlineGrammar {
    pub const ID: GrammarId = GrammarId::new("inline");

    pub const OPEN_TAG: TokenKind = TokenKind(1);
    pub const CLOSE_TAG: TokenKind = TokenKind(2);
    pub const NAME: TokenKind = TokenKind(3);
    pub const SEPARATOR: TokenKind = TokenKind(4);
    pub const DEFAULT: TokenKind = TokenKind(5);
}

impl Grammar for InlineGrammar {
    fn id(&self) -> GrammarId {
        Self::ID
    }

    fn parse(&self, src: &mut Buffer<'_>) -> Result<Vec<Item>, ScannerError> {
        let mut out = Vec::new();

        while let Some(item) = src.next() {
            let dollar = match item {
                Item::Byte(byte) if byte.ch == '$' && src.lookahead_byte(1) == "{" => byte,
                other => {
                    out.push(other);
                    continue;
                }
            };

            match InlineScanner::default().scan(src, dollar.offset) {
                Some(tokens) => out.extend(tokens.into_iter().map(Item::Token)),
                None => {
                    out.push(Item::Byte(dollar));
                    src.replay(dollar.offset);
                }
            }
        }

        Ok(out)
    }

    fn token_name(&self, kind: TokenKind) -> &'static str {
        match kind {
            Self::OPEN_TAG => "INLINE:OPEN_TAG",
            Self::CLOSE_TAG => "INLINE:CLOSE_TAG",
            Self::NAME => "INLINE:NAME",
            Self::SEPARATOR => "INLINE:SEPARATOR",
            Self::DEFAULT => "INLINE:DEFAULT",
            _ => "INLINE:UNDEFINED",
        }
    }
}

#[derive(Default)]
struct InlineScanner {
    tokens: Vec<Token>,
    name: Vec<Item>,
    default: Option<Vec<Item>>,
}

impl InlineScanner {
    fn scan(mut self, src: &mut Buffer<'_>, offset: usize) -> Option<Vec<Token>> {
        src.next();
        self.push(InlineGrammar::OPEN_TAG, offset, "${");

        while let Some(item) = src.next() {
            // no other grammars are allowed inside
            let Item::Byte(byte) = item else {
                return None;
            };

            match byte.ch {
                '"' | '\'' => {
                    let default = self.default.as_mut()?;
                    default.push(item);
                    while let Some(next) = src.next() {
                        let closes = next.is_char(byte.ch);
                        default.push(next);
                        if closes {
                            break;
                        }
                    }
                }
                '}' => {
                    self.flush();
                    self.push(InlineGrammar::CLOSE_TAG, byte.offset, "}");
                    return self.is_valid().then_some(self.tokens);
                }
                '|' => {
                    self.flush();
                    self.push(InlineGrammar::SEPARATOR, byte.offset, "|");
                    self.default = Some(Vec::new());
                }
                ch => {
                    if let Some(default) = self.default.as_mut() {
                        default.push(item);
                    } else if ch.is_whitespace() {
                        self.flush_name();
                    } else if is_keyword_char(ch) {
                        self.name.push(item);
                    } else {
                        return None;
                    }
                }
            }
        }

        None
    }

    fn flush_name(&mut self) {
        if !self.name.is_empty() {
            let inner = std::mem::take(&mut self.name);
            self.tokens
                .push(pack_token(inner, InlineGrammar::NAME, InlineGrammar::ID));
        }
    }

    fn is_valid(&self) -> bool {
        let names = self.count(InlineGrammar::NAME);
        let separators = self.count(InlineGrammar::SEPARATOR);
        let defaults = self.count(InlineGrammar::DEFAULT);

        names == 1 && separators <= 1 && defaults <= separators
    }

    fn count(&self, kind: TokenKind) -> usize {
        self.tokens.iter().filter(|t| t.kind == kind).count()
    }

    fn push(&mut self, kind: TokenKind, offset: usize, content: &str) {
        self.tokens
            .push(Token::new(kind, Some(offset), content).with_grammar(InlineGrammar::ID));
    }

    fn flush(&mut self) {
        self.flush_name();
        if let Some(default) = self.default.as_mut().filter(|d| !d.is_empty()) {
            let inner = std::mem::take(default);
            self.tokens
                .push(pack_token(inner, InlineGrammar::DEFAULT, InlineGrammar::ID));
        }
    }
}
