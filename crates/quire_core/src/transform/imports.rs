//! Resolves `<use:*>` imports.
//!
//! ```html
//! <use:element path="ui/button" as="btn"/>
//! <use:dir dir="ui" ns="ui"/>
//! <use:bundle path="ui/bundle" ns="kit"/>
//! <use:inline name="badge"><span>${context}</span></use:inline>
//! ```
//!
//! Imports are visible in the template or tag that declares them and
//! everything below it. Inner declarations shadow outer ones, and within one
//! scope the latest declaration wins.

use std::sync::Arc;

use quire_ast::visitor::{Leave, Signal, Traverser, Visitor, VisitorContext};
use quire_ast::{Context, Node, Tag, Template, Value};
use tracing::debug;

use super::merger::{MergeMode, Merger};
use super::prepare;
use super::stack::{UNIQUE_ID, push_kind};
use crate::builder::Builder;
use crate::error::CompileError;
use crate::loader::normalize_path;

const USE_PREFIX: &str = "use:";

/// A registered import.
#[derive(Debug, Clone, PartialEq)]
pub enum Import {
    /// A single template under an alias.
    Element { path: String, alias: String },
    /// Every template of a directory under `namespace:name`.
    Directory { dir: String, namespace: String },
    /// Imports declared by another template.
    Bundle { path: String, imports: Vec<Import> },
    /// Content declared in place.
    Inline { name: String, nodes: Vec<Node> },
}

/// What an import resolves a tag name to.
enum Target {
    Path(String),
    Inline { name: String, nodes: Vec<Node> },
}

impl Import {
    fn resolve(&self, name: &str, builder: &Builder) -> Option<Target> {
        match self {
            Import::Element { path, alias } => (alias == name).then(|| Target::Path(path.clone())),
            Import::Directory { dir, namespace } => {
                let rest = name.strip_prefix(namespace.as_str())?.strip_prefix(':')?;
                let path = format!("{dir}/{rest}");
                builder.exists(&path).then_some(Target::Path(path))
            }
            Import::Bundle { imports, .. } => imports
                .iter()
                .rev()
                .find_map(|import| import.resolve(name, builder)),
            Import::Inline { name: inline, nodes } => (inline == name).then(|| Target::Inline {
                name: inline.clone(),
                nodes: nodes.clone(),
            }),
        }
    }

    /// Moves the import under `namespace`.
    fn prefixed(self, namespace: &str) -> Self {
        match self {
            Import::Element { path, alias } => Import::Element {
                path,
                alias: format!("{namespace}:{alias}"),
            },
            Import::Directory { dir, namespace: ns } => Import::Directory {
                dir,
                namespace: format!("{namespace}:{ns}"),
            },
            Import::Bundle { path, imports } => Import::Bundle {
                path,
                imports: imports.into_iter().map(|i| i.prefixed(namespace)).collect(),
            },
            Import::Inline { name, nodes } => Import::Inline {
                name: format!("{namespace}:{name}"),
                nodes,
            },
        }
    }
}

/// Replaces tags matching an import with the imported template merged with
/// the tag.
pub struct ResolveImports<'b> {
    builder: &'b Builder,
    scopes: Vec<Vec<Import>>,
}

impl<'b> ResolveImports<'b> {
    pub fn new(builder: &'b Builder) -> Self {
        Self {
            builder,
            scopes: vec![Vec::new()],
        }
    }

    fn opens_scope(node: &Node) -> bool {
        match node {
            Node::Template(_) => true,
            Node::Tag(tag) => !tag.name.starts_with(USE_PREFIX),
            _ => false,
        }
    }

    fn skips(tag: &Tag) -> bool {
        tag.name.starts_with("extends") || tag.name.starts_with("stack:")
    }

    fn find(&self, name: &str) -> Option<Target> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find_map(|import| import.resolve(name, self.builder))
    }

    /// Builds the import declared by a `use:*` tag.
    fn declare(&self, tag: Tag, bundles: &mut Vec<String>) -> Result<Import, CompileError> {
        let kind = &tag.name[USE_PREFIX.len()..];
        let required = |name: &str| {
            tag.attr_text(name).filter(|v| !v.is_empty()).ok_or_else(|| {
                CompileError::import(
                    format!("Missing `{name}` attribute on `{}`", tag.name),
                    tag.context.clone(),
                    None,
                )
            })
        };

        match kind {
            "element" => {
                let path = required("path")?;
                let alias = match tag.attr_text("as") {
                    Some(alias) => alias,
                    None => self.basename(&path, tag.context.as_ref())?,
                };
                Ok(Import::Element { path, alias })
            }
            "dir" => {
                let dir = required("dir")?;
                let namespace = match tag.attr_text("ns") {
                    Some(ns) => ns,
                    None => self.basename(&dir, tag.context.as_ref())?,
                };
                Ok(Import::Directory { dir, namespace })
            }
            "bundle" => {
                let path = required("path")?;
                let imports = self.bundle(&path, tag.context.as_ref(), bundles)?;
                Ok(match tag.attr_text("ns") {
                    Some(ns) => Import::Bundle { path, imports }.prefixed(&ns),
                    None => Import::Bundle { path, imports },
                })
            }
            "inline" => Ok(Import::Inline {
                name: required("name")?,
                nodes: tag.nodes,
            }),
            _ => Err(CompileError::import(
                format!("Undefined import type `{}`", tag.name),
                tag.context,
                None,
            )),
        }
    }

    fn basename(&self, path: &str, context: Option<&Arc<Context>>) -> Result<String, CompileError> {
        let normalized = normalize_path(path, &self.builder.config().extension).map_err(|e| {
            CompileError::import(format!("Invalid import path `{path}`"), context.cloned(), Some(e.into()))
        })?;
        Ok(normalized.rsplit('/').next().unwrap_or_default().to_string())
    }

    /// Reads the `use:*` declarations at the top of a bundle template.
    fn bundle(
        &self,
        path: &str,
        context: Option<&Arc<Context>>,
        bundles: &mut Vec<String>,
    ) -> Result<Vec<Import>, CompileError> {
        if bundles.iter().any(|p| p == path) {
            return Err(CompileError::import(
                format!("Circular reference to bundle `{path}`"),
                context.cloned(),
                None,
            ));
        }

        let wrap = |e: CompileError| {
            CompileError::import(format!("Unable to import bundle `{path}`"), context.cloned(), Some(e))
        };
        let source = self.builder.loader().load(path).map_err(|e| wrap(e.into()))?;
        let template = self.builder.parse(&source).map_err(wrap)?;
        let nodes = prepare(template.nodes).map_err(wrap)?;

        bundles.push(path.to_string());
        let mut imports = Vec::new();
        for node in nodes {
            if let Node::Tag(tag) = node
                && tag.name.starts_with(USE_PREFIX)
            {
                imports.push(self.declare(tag, bundles)?);
            }
        }
        bundles.pop();

        debug!(bundle = %path, count = imports.len(), "imported bundle");
        Ok(imports)
    }

    fn import(&self, tag: Tag, target: Target) -> Result<Node, CompileError> {
        let instance = self.builder.next_instance();
        let context = tag.context.clone();

        let (origin, nodes) = match target {
            Target::Path(path) => {
                let template = self.builder.load(&path).map_err(|e| {
                    CompileError::import(format!("Unable to import `{path}`"), context.clone(), Some(e))
                })?;
                (path, template.nodes)
            }
            Target::Inline { name, nodes } => (name, nodes),
        };
        debug!(tag = %tag.name, import = %origin, instance, "resolved import");

        let mut qualify = QualifyUniqueIds {
            prefix: format!("{origin}#{instance}"),
        };
        let nodes = Traverser::new().with_visitor(&mut qualify).traverse(nodes)?;

        let nodes = Merger::new(MergeMode::Import).merge(nodes, tag)?;
        Ok(Template::with_nodes(nodes, context).into())
    }
}

impl Visitor for ResolveImports<'_> {
    type Error = CompileError;

    fn enter_node(&mut self, node: &mut Node, _ctx: &VisitorContext) -> Result<Signal, CompileError> {
        if Self::opens_scope(node) {
            self.scopes.push(Vec::new());
        }

        Ok(match node {
            Node::Tag(tag) if tag.name.starts_with(USE_PREFIX) => Signal::SkipChildren,
            _ => Signal::Continue,
        })
    }

    fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        if Self::opens_scope(&node) {
            self.scopes.pop();
        }

        let Node::Tag(tag) = node else {
            return Ok(node.into());
        };

        if tag.name.starts_with(USE_PREFIX) {
            let import = self.declare(tag, &mut Vec::new())?;
            if let Some(scope) = self.scopes.last_mut() {
                scope.push(import);
            }
            return Ok(Leave::Remove);
        }

        if Self::skips(&tag) {
            return Ok(Node::Tag(tag).into());
        }

        match self.find(&tag.name) {
            Some(target) => Ok(self.import(tag, target)?.into()),
            None => Ok(Node::Tag(tag).into()),
        }
    }
}

/// Qualifies the `unique-id` of pushes made by an imported template so that
/// every import instance collects its own content.
struct QualifyUniqueIds {
    prefix: String,
}

impl Visitor for QualifyUniqueIds {
    type Error = CompileError;

    fn leave_node(&mut self, node: Node, _ctx: &mut VisitorContext) -> Result<Leave, CompileError> {
        let Node::Tag(mut tag) = node else {
            return Ok(node.into());
        };
        if push_kind(&tag).is_none() {
            return Ok(Node::Tag(tag).into());
        }

        for attr in &mut tag.attrs {
            if let Node::Attr(attr) = attr
                && attr.name.as_text() == Some(UNIQUE_ID)
                && let Some(id) = attr.value_text()
            {
                attr.value = Some(Value::Text(format!("\"{}:{id}\"", self.prefix)));
            }
        }
        Ok(Node::Tag(tag).into())
    }
}
