use quire_ast::Directive;

use super::{DirectiveRenderer, optional_body};
use crate::error::CompileError;

/// Raw host code: `@php($x = 1)` or a `@php ... @endphp` block.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpDirective;

impl DirectiveRenderer for PhpDirective {
    fn names(&self) -> &'static [&'static str] {
        &["php", "endphp"]
    }

    fn render(&self, directive: &Directive) -> Result<Option<String>, CompileError> {
        let code = match directive.name.to_lowercase().as_str() {
            "php" => match optional_body(directive) {
                Some(code) => format!("<?php {}; ?>", code.trim_end_matches(';')),
                None => "<?php ".to_string(),
            },
            "endphp" => " ?>".to_string(),
            _ => return Ok(None),
        };
        Ok(Some(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::directive;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("php", Some("$x = 1"), "<?php $x = 1; ?>")]
    #[case("php", Some("$x = 1;"), "<?php $x = 1; ?>")]
    #[case("php", None, "<?php ")]
    #[case("endphp", None, " ?>")]
    fn test_render(#[case] name: &str, #[case] body: Option<&str>, #[case] expected: &str) {
        let code = PhpDirective.render(&directive(name, body)).unwrap();
        assert_eq!(code.as_deref(), Some(expected));
    }
}
