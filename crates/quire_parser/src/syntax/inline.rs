use quire_ast::{Block, Raw};
use quire_lexer::Token;
use quire_lexer::grammar::InlineGrammar;

use super::Syntax;
use crate::assembler::Assembler;
use crate::error::ParserError;
use crate::parser::Session;

/// `${name|default}` placeholders, parsed into blocks.
#[derive(Debug, Default)]
pub struct InlineSyntax {
    block: Option<Block>,
}

impl Syntax for InlineSyntax {
    fn handle(
        &mut self,
        session: &Session<'_>,
        asm: &mut Assembler,
        token: Token,
    ) -> Result<(), ParserError> {
        match token.kind {
            InlineGrammar::OPEN_TAG => {
                self.block = Some(Block::new(None, Vec::new(), Some(session.context(&token))));
            }
            InlineGrammar::NAME => {
                if let Some(block) = self.block.as_mut() {
                    block.name = Some(token.content);
                }
            }
            InlineGrammar::DEFAULT => {
                if let Some(block) = self.block.as_mut() {
                    let default = token.content.trim();
                    if !default.is_empty() {
                        let raw = Raw::new(default, Some(session.context(&token)));
                        block.nodes.push(raw.into());
                    }
                }
            }
            InlineGrammar::CLOSE_TAG => {
                if let Some(block) = self.block.take() {
                    asm.push(block.into());
                }
            }
            _ => {}
        }
        Ok(())
    }
}
