use quire_ast::Directive;

use super::{DirectiveRenderer, required_body};
use crate::error::CompileError;

const DEFAULT_FLAGS: &str = "JSON_HEX_TAG | JSON_HEX_APOS | JSON_HEX_AMP | JSON_HEX_QUOT";
const DEFAULT_DEPTH: &str = "512";

/// `@json(value[, flags[, depth]])`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDirective;

impl DirectiveRenderer for JsonDirective {
    fn names(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn render(&self, directive: &Directive) -> Result<Option<String>, CompileError> {
        if !directive.name.eq_ignore_ascii_case("json") {
            return Ok(None);
        }

        required_body(directive)?;
        let arg = |index: usize, default: &'static str| {
            directive
                .values
                .get(index)
                .map(String::as_str)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        Ok(Some(format!(
            "<?php echo json_encode({}, {}, {}); ?>",
            arg(0, ""),
            arg(1, DEFAULT_FLAGS),
            arg(2, DEFAULT_DEPTH)
        )))
    }
}
