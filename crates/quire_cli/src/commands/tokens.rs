//! Tokens command implementation

use miette::{IntoDiagnostic, Result};
use quire_core::{Builder, CompileError};
use quire_lexer::{Lexer, Token};
use quire_parser::ParserError;

use super::load_config;
use crate::cli::Cli;

pub fn run_tokens(cli: &Cli, path: &str) -> Result<()> {
    let builder = Builder::from_config(load_config(cli)?);
    let source = builder.loader().load(path).into_diagnostic()?;

    let lexer = builder.parser().lexer();
    let tokens = lexer
        .parse(&source.content)
        .map_err(|e| {
            let err: CompileError = ParserError::scanner(e, Some(source.path.as_str())).into();
            builder.locate(err)
        })
        .into_diagnostic()?;

    for token in &tokens {
        print_token(lexer, token, 0);
    }
    Ok(())
}

/// Prints one token per line, nested tokens indented below their parent.
fn print_token(lexer: &Lexer, token: &Token, depth: usize) {
    let offset = token
        .offset
        .map_or_else(|| "-".to_string(), |offset| offset.to_string());
    println!(
        "{:>6} {:indent$}{:<20} {:?}",
        offset,
        "",
        lexer.token_name(token),
        token.content,
        indent = depth * 2
    );

    for child in &token.tokens {
        print_token(lexer, child, depth + 1);
    }
}
