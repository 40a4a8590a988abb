use quire_ast::Directive;

use super::{DirectiveRenderer, optional_body, required_body};
use crate::error::CompileError;

/// `@foreach`, `@for` and `@while` loops with `@break` and `@continue`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopDirective;

impl DirectiveRenderer for LoopDirective {
    fn names(&self) -> &'static [&'static str] {
        &[
            "foreach",
            "endforeach",
            "for",
            "endfor",
            "while",
            "endwhile",
            "break",
            "continue",
        ]
    }

    fn render(&self, directive: &Directive) -> Result<Option<String>, CompileError> {
        let code = match directive.name.to_lowercase().as_str() {
            "foreach" => format!("<?php foreach({}): ?>", required_body(directive)?),
            "endforeach" => "<?php endforeach; ?>".to_string(),
            "for" => format!("<?php for({}): ?>", required_body(directive)?),
            "endfor" => "<?php endfor; ?>".to_string(),
            "while" => format!("<?php while({}): ?>", required_body(directive)?),
            "endwhile" => "<?php endwhile; ?>".to_string(),
            keyword @ ("break" | "continue") => match optional_body(directive) {
                Some(levels) => format!("<?php {keyword} {levels}; ?>"),
                None => format!("<?php {keyword}; ?>"),
            },
            _ => return Ok(None),
        };
        Ok(Some(code))
    }
}
