use quire_ast::Php;
use quire_lexer::Token;
use quire_lexer::grammar::PhpGrammar;

use super::Syntax;
use crate::assembler::Assembler;
use crate::error::ParserError;
use crate::parser::Session;

/// Host language blocks, kept as written.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpSyntax;

impl Syntax for PhpSyntax {
    fn handle(
        &mut self,
        session: &Session<'_>,
        asm: &mut Assembler,
        token: Token,
    ) -> Result<(), ParserError> {
        if token.kind != PhpGrammar::CODE {
            return Ok(());
        }

        let context = session.context(&token);
        asm.push(
            Php {
                content: token.content,
                tokens: token.tokens,
                context: Some(context),
            }
            .into(),
        );
        Ok(())
    }
}
