//! Directive rendering.
//!
//! A [`DirectiveRenderer`] turns `@name(body)` calls into host language
//! source. Renderers are grouped by family and composed into a
//! [`DirectiveGroup`], which asks each family in registration order.

mod conditional;
mod json;
mod loops;
mod php;

pub use conditional::ConditionalDirective;
pub use json::JsonDirective;
pub use loops::LoopDirective;
pub use php::PhpDirective;

use quire_ast::Directive;

use crate::config::DirectiveFamily;
use crate::error::CompileError;

/// Renders a family of directives.
pub trait DirectiveRenderer {
    /// Lower case names handled by the renderer.
    fn names(&self) -> &'static [&'static str];

    fn has_directive(&self, name: &str) -> bool {
        self.names().iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Returns `None` when the directive is not handled.
    fn render(&self, directive: &Directive) -> Result<Option<String>, CompileError>;
}

/// Ordered set of directive families. The first family that renders a
/// directive wins.
#[derive(Default)]
pub struct DirectiveGroup {
    renderers: Vec<Box<dyn DirectiveRenderer>>,
}

impl DirectiveGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group from configured families.
    pub fn from_families(families: &[DirectiveFamily]) -> Self {
        families.iter().fold(Self::new(), |group, family| match family {
            DirectiveFamily::Conditional => group.with_renderer(ConditionalDirective),
            DirectiveFamily::Loop => group.with_renderer(LoopDirective),
            DirectiveFamily::Json => group.with_renderer(JsonDirective),
            DirectiveFamily::Php => group.with_renderer(PhpDirective),
        })
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: impl DirectiveRenderer + 'static) -> Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    /// Every directive name known to the group.
    pub fn names(&self) -> Vec<&'static str> {
        self.renderers
            .iter()
            .flat_map(|r| r.names().iter().copied())
            .collect()
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.renderers.iter().any(|r| r.has_directive(name))
    }

    pub fn render(&self, directive: &Directive) -> Result<Option<String>, CompileError> {
        for renderer in &self.renderers {
            if !renderer.has_directive(&directive.name) {
                continue;
            }
            if let Some(code) = renderer.render(directive)? {
                return Ok(Some(code));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for DirectiveGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Trimmed body of a directive which requires one.
pub(crate) fn required_body(directive: &Directive) -> Result<&str, CompileError> {
    directive
        .body
        .as_deref()
        .map(str::trim)
        .filter(|body| !body.is_empty())
        .ok_or_else(|| {
            CompileError::directive(
                format!("Directive `@{}` requires a body", directive.name),
                directive.context.clone(),
            )
        })
}

/// Trimmed body, if any.
pub(crate) fn optional_body(directive: &Directive) -> Option<&str> {
    directive
        .body
        .as_deref()
        .map(str::trim)
        .filter(|body| !body.is_empty())
}

#[cfg(test)]
pub(crate) fn directive(name: &str, body: Option<&str>) -> Directive {
    let mut directive = Directive {
        name: name.to_string(),
        body: None,
        values: Vec::new(),
        context: None,
    };
    if let Some(body) = body {
        directive.set_body(body.to_string());
    }
    directive
}
