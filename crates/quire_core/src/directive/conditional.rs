use quire_ast::Directive;

use super::{DirectiveRenderer, required_body};
use crate::error::CompileError;

/// `@if`, `@unless`, `@isset`, `@empty` and `@switch` blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionalDirective;

impl DirectiveRenderer for ConditionalDirective {
    fn names(&self) -> &'static [&'static str] {
        &[
            "if",
            "elseif",
            "else",
            "endif",
            "unless",
            "endunless",
            "isset",
            "endisset",
            "empty",
            "endempty",
            "switch",
            "case",
            "default",
            "endswitch",
        ]
    }

    fn render(&self, directive: &Directive) -> Result<Option<String>, CompileError> {
        let code = match directive.name.to_lowercase().as_str() {
            "if" => format!("<?php if({}): ?>", required_body(directive)?),
            "elseif" => format!("<?php elseif({}): ?>", required_body(directive)?),
            "else" => "<?php else: ?>".to_string(),
            "unless" => format!("<?php if(!({})): ?>", required_body(directive)?),
            "isset" => format!("<?php if(isset({})): ?>", required_body(directive)?),
            "empty" => format!("<?php if(empty({})): ?>", required_body(directive)?),
            "endif" | "endunless" | "endisset" | "endempty" => "<?php endif; ?>".to_string(),
            "switch" => format!("<?php switch({}): ?>", required_body(directive)?),
            "case" => format!("<?php case {}: ?>", required_body(directive)?),
            "default" => "<?php default: ?>".to_string(),
            "endswitch" => "<?php endswitch; ?>".to_string(),
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
    #[case("if", Some("$a > 1"), "<?php if($a > 1): ?>")]
    #[case("elseif", Some("$b"), "<?php elseif($b): ?>")]
    #[case("else", None, "<?php else: ?>")]
    #[case("endif", None, "<?php endif; ?>")]
    #[case("unless", Some("$a || $b"), "<?php if(!($a || $b)): ?>")]
    #[case("endunless", None, "<?php endif; ?>")]
    #[case("isset", Some("$user"), "<?php if(isset($user)): ?>")]
    #[case("empty", Some("$list"), "<?php if(empty($list)): ?>")]
    #[case("switch", Some("$x"), "<?php switch($x): ?>")]
    #[case("case", Some("1"), "<?php case 1: ?>")]
    #[case("default", None, "<?php default: ?>")]
    #[case("endswitch", None, "<?php endswitch; ?>")]
    #[case("If", Some("$a"), "<?php if($a): ?>")]
    fn test_render(#[case] name: &str, #[case] body: Option<&str>, #[case] expected: &str) {
        let code = ConditionalDirective.render(&directive(name, body)).unwrap();
        assert_eq!(code.as_deref(), Some(expected));
    }

    #[test]
    fn test_missing_condition() {
        let err = ConditionalDirective.render(&directive("if", None)).unwrap_err();
        assert!(matches!(err, CompileError::Directive(_)));
    }
}
