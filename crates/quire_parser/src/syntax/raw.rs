use quire_ast::Raw;
use quire_lexer::Token;

use super::Syntax;
use crate::assembler::Assembler;
use crate::error::ParserError;
use crate::parser::Session;

/// Plain content.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSyntax;

impl Syntax for RawSyntax {
    fn handle(
        &mut self,
        session: &Session<'_>,
        asm: &mut Assembler,
        token: Token,
    ) -> Result<(), ParserError> {
        let context = session.context(&token);
        asm.push(Raw::new(token.content, Some(context)).into());
        Ok(())
    }
}
