use std::sync::Arc;

use quire_ast::{Context, Directive, Node, Output, split_values};
use quire_lexer::Token;
use quire_lexer::grammar::DynamicGrammar;

use super::Syntax;
use crate::assembler::Assembler;
use crate::error::ParserError;
use crate::parser::Session;

/// Echo statements and directives.
#[derive(Debug, Default)]
pub struct DynamicSyntax {
    output: Option<Output>,
    /// Context of the `@` of the directive being read.
    directive: Option<Arc<Context>>,
}

impl Syntax for DynamicSyntax {
    fn handle(
        &mut self,
        session: &Session<'_>,
        asm: &mut Assembler,
        token: Token,
    ) -> Result<(), ParserError> {
        match token.kind {
            DynamicGrammar::OPEN_TAG | DynamicGrammar::OPEN_RAW_TAG => {
                self.output = Some(Output {
                    body: String::new(),
                    raw: token.kind == DynamicGrammar::OPEN_RAW_TAG,
                    filter: None,
                    context: Some(session.context(&token)),
                });
            }
            DynamicGrammar::CLOSE_TAG | DynamicGrammar::CLOSE_RAW_TAG => {
                if let Some(output) = self.output.take() {
                    asm.push(output.into());
                }
            }
            DynamicGrammar::DIRECTIVE => {
                self.directive = Some(session.context(&token));
            }
            DynamicGrammar::KEYWORD => {
                let context = self
                    .directive
                    .take()
                    .unwrap_or_else(|| session.context(&token));
                asm.push(
                    Directive {
                        name: token.content,
                        body: None,
                        values: Vec::new(),
                        context: Some(context),
                    }
                    .into(),
                );
            }
            DynamicGrammar::BODY_OPEN => {
                if let Some(Node::Directive(directive)) = asm.last_mut() {
                    directive.body = Some(String::new());
                }
            }
            DynamicGrammar::BODY => {
                if let Some(output) = self.output.as_mut() {
                    let (body, filter) = split_filter(&token.content);
                    output.filter = filter.map(str::to_string);
                    output.body = body.to_string();
                    return Ok(());
                }

                if let Some(Node::Directive(directive)) = asm.last_mut() {
                    let Some(values) = split_values(&token.content) else {
                        return Err(ParserError::syntax(
                            format!("Unbalanced brackets in body of directive `@{}`", directive.name),
                            directive.context.clone(),
                        ));
                    };
                    directive.body = Some(token.content);
                    directive.values = values;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Splits a trailing `|name` filter annotation off an output body.
///
/// The bar must follow whitespace and the name must follow the bar directly,
/// so `$a | FLAG` and `$a || $b` stay plain expressions.
fn split_filter(body: &str) -> (&str, Option<&str>) {
    let trimmed = body.trim_end();
    let Some(bar) = trimmed.rfind('|') else {
        return (body, None);
    };

    let name = &trimmed[bar + 1..];
    let is_name = name
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_')
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if !is_name || !trimmed[..bar].ends_with(char::is_whitespace) {
        return (body, None);
    }

    (&trimmed[..bar], Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parser;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(" $x |upper ", " $x ", Some("upper"))]
    #[case("$x |e", "$x ", Some("e"))]
    #[case(" $x ", " $x ", None)]
    #[case(" $a | FLAG ", " $a | FLAG ", None)]
    #[case(" $a || $b ", " $a || $b ", None)]
    #[case(" $a|b ", " $a|b ", None)]
    #[case(" 'a |b' ", " 'a |b' ", None)]
    #[case(" $x |2x ", " $x |2x ", None)]
    fn test_split_filter(#[case] body: &str, #[case] expected: &str, #[case] filter: Option<&str>) {
        assert_eq!(split_filter(body), (expected, filter));
    }

    #[test]
    fn test_output_filter_annotation() {
        let nodes = Parser::default()
            .parse("{{ $title |upper }}{!! $html |purify !!}{{ $a | B }}", None)
            .unwrap()
            .nodes;
        let filters: Vec<_> = nodes
            .iter()
            .map(|node| match node {
                Node::Output(output) => (output.body.as_str(), output.filter.as_deref()),
                other => panic!("expected output, got {}", other.kind()),
            })
            .collect();
        assert_eq!(
            filters,
            vec![(" $title ", Some("upper")), (" $html ", Some("purify")), (" $a | B ", None)]
        );
    }
}
