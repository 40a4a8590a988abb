//! Per-grammar token handlers.

mod dynamic;
mod html;
mod inline;
mod php;
mod raw;

pub use dynamic::DynamicSyntax;
pub use html::HtmlSyntax;
pub use inline::InlineSyntax;
pub use php::PhpSyntax;
pub use raw::RawSyntax;

use quire_lexer::Token;

use crate::assembler::Assembler;
use crate::error::ParserError;
use crate::parser::Session;

/// Turns the tokens of one grammar into nodes.
///
/// A syntax sees the tokens of its grammar in source order and may keep state
/// between them, for example while a tag is being read.
pub trait Syntax {
    fn handle(
        &mut self,
        session: &Session<'_>,
        asm: &mut Assembler,
        token: Token,
    ) -> Result<(), ParserError>;
}
