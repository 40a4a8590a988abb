use crate::buffer::Buffer;
use crate::error::ScannerError;
use crate::grammar::Grammar;
use crate::token::{GrammarId, Item, Token, TokenKind};

/// Groups every run of leftover bytes into a single RAW token.
///
/// Always runs last, so the lexer output never contains bare bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawGrammar;

impl Grammar for RawGrammar {
    fn id(&self) -> GrammarId {
        GrammarId::RAW
    }

    fn parse(&self, src: &mut Buffer<'_>) -> Result<Vec<Item>, ScannerError> {
        let mut out = Vec::new();
        let mut raw: Option<Token> = None;

        for item in src {
            match item {
                Item::Byte(byte) => raw
                    .get_or_insert_with(|| Token::new(TokenKind::RAW, Some(byte.offset), ""))
                    .content
                    .push(byte.ch),
                Item::Token(token) => {
                    if let Some(pending) = raw.take() {
                        out.push(Item::Token(pending));
                    }
                    out.push(Item::Token(token));
                }
            }
        }

        if let Some(pending) = raw {
            out.push(Item::Token(pending));
        }

        Ok(out)
    }

    fn token_name(&self, kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::RAW => "RAW",
            _ => "RAW:UNDEFINED",
        }
    }
}
