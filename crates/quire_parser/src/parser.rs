//! Parser driver.

use std::sync::Arc;

use quire_ast::{Context, Mixin, Node, Raw, Template, Value, Verbatim};
use quire_lexer::grammar::{DynamicGrammar, HtmlGrammar, InlineGrammar, PhpGrammar};
use quire_lexer::{GrammarId, Lexer, Token};
use tracing::debug;

use crate::assembler::Assembler;
use crate::error::ParserError;
use crate::syntax::{DynamicSyntax, HtmlSyntax, InlineSyntax, PhpSyntax, RawSyntax, Syntax};

type SyntaxFactory = Box<dyn Fn() -> Box<dyn Syntax>>;

/// Lexes template text and assembles the tokens into a [`Template`].
///
/// Every token is dispatched to the [`Syntax`] registered for the grammar that
/// produced it. Syntaxes keep state between tokens, so each parse (and each
/// nested token parse) works on fresh instances created by the registered
/// factories.
pub struct Parser {
    lexer: Lexer,
    syntax: Vec<(GrammarId, SyntaxFactory)>,
}

impl Parser {
    /// Creates a parser for the given lexer with only the raw syntax
    /// registered.
    pub fn new(lexer: Lexer) -> Self {
        Self {
            lexer,
            syntax: Vec::new(),
        }
        .with_syntax(GrammarId::RAW, || Box::new(RawSyntax))
    }

    /// Creates the standard HTML template parser.
    ///
    /// Layers, in order: php, inline, dynamic, html.
    pub fn with_dynamic(dynamic: DynamicGrammar) -> Self {
        let lexer = Lexer::new()
            .with_grammar(PhpGrammar)
            .with_grammar(InlineGrammar)
            .with_grammar(dynamic)
            .with_grammar(HtmlGrammar);

        Self::new(lexer)
            .with_syntax(PhpGrammar::ID, || Box::new(PhpSyntax))
            .with_syntax(InlineGrammar::ID, || Box::<InlineSyntax>::default())
            .with_syntax(DynamicGrammar::ID, || Box::<DynamicSyntax>::default())
            .with_syntax(HtmlGrammar::ID, || Box::<HtmlSyntax>::default())
    }

    /// Registers the syntax handling tokens of `grammar`, replacing any
    /// previous one.
    #[must_use]
    pub fn with_syntax(
        mut self,
        grammar: GrammarId,
        factory: impl Fn() -> Box<dyn Syntax> + 'static,
    ) -> Self {
        self.syntax.retain(|(id, _)| *id != grammar);
        self.syntax.push((grammar, Box::new(factory)));
        self
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    /// Parses a template. `path` is recorded in every node context.
    pub fn parse(&self, source: &str, path: Option<&str>) -> Result<Template, ParserError> {
        let tokens = self
            .lexer
            .parse(source)
            .map_err(|e| ParserError::scanner(e, path))?;
        self.assemble(tokens, path)
    }

    /// Builds a template from tokens produced by [`Parser::lexer`].
    pub fn assemble(&self, tokens: Vec<Token>, path: Option<&str>) -> Result<Template, ParserError> {
        let session = Session { parser: self, path };
        let mut asm = Assembler::new();
        session.parse_tokens(&mut asm, tokens)?;
        let nodes = asm.finish()?;

        debug!(path = path.unwrap_or("<inline>"), nodes = nodes.len(), "parsed template");
        Ok(Template::with_nodes(
            nodes,
            Some(Context::new(None, path.map(str::to_string))),
        ))
    }

    fn syntaxes(&self) -> Vec<(GrammarId, Box<dyn Syntax>)> {
        self.syntax.iter().map(|(id, factory)| (*id, factory())).collect()
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::with_dynamic(DynamicGrammar::new())
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("lexer", &self.lexer)
            .field("syntax", &self.syntax.iter().map(|(id, _)| *id).collect::<Vec<_>>())
            .finish()
    }
}

/// A single parse run, handed to syntaxes so they can parse nested tokens.
pub struct Session<'p> {
    parser: &'p Parser,
    path: Option<&'p str>,
}

impl Session<'_> {
    pub fn path(&self) -> Option<&str> {
        self.path
    }

    /// Context for a node created from `token`.
    pub fn context(&self, token: &Token) -> Arc<Context> {
        Context::from_token(token, self.path)
    }

    /// Dispatches `tokens` to their syntaxes.
    pub fn parse_tokens(&self, asm: &mut Assembler, tokens: Vec<Token>) -> Result<(), ParserError> {
        let mut syntaxes = self.parser.syntaxes();

        for token in tokens {
            let syntax = syntaxes
                .iter_mut()
                .find(|(id, _)| Some(*id) == token.grammar)
                .map(|(_, syntax)| syntax);

            match syntax {
                Some(syntax) => syntax.handle(self, asm, token)?,
                None => {
                    return Err(ParserError::UnknownGrammar {
                        grammar: token.grammar.map(|g| g.to_string()).unwrap_or_default(),
                        context: Some(self.context(&token)),
                    });
                }
            }
        }

        Ok(())
    }

    /// Static text for plain tokens, a [`Mixin`] for tokens wrapping output of
    /// other grammars.
    pub fn parse_token(&self, token: Token) -> Result<Value, ParserError> {
        if token.tokens.is_empty() {
            return Ok(Value::Text(token.content));
        }

        let context = self.context(&token);
        let mut asm = Assembler::new();
        self.parse_tokens(&mut asm, token.tokens)?;
        Ok(Value::from(Node::Mixin(Mixin {
            nodes: asm.finish()?,
            context: Some(context),
        })))
    }

    /// Parses a token whose content must not be read as markup.
    pub fn parse_verbatim(&self, token: Token) -> Result<Verbatim, ParserError> {
        let context = self.context(&token);

        if token.tokens.is_empty() {
            let mut nodes = Vec::new();
            if !token.content.is_empty() {
                nodes.push(Raw::new(token.content, Some(context.clone())).into());
            }
            return Ok(Verbatim {
                nodes,
                context: Some(context),
            });
        }

        let mut asm = Assembler::new();
        self.parse_tokens(&mut asm, token.tokens)?;
        Ok(Verbatim {
            nodes: asm.finish()?,
            context: Some(context),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quire_ast::{Attr, Tag};

    fn parse(source: &str) -> Vec<Node> {
        Parser::default().parse(source, Some("test")).unwrap().nodes
    }

    fn tag(node: &Node) -> &Tag {
        match node {
            Node::Tag(tag) => tag,
            other => panic!("expected tag, got {}", other.kind()),
        }
    }

    fn attr(node: &Node) -> &Attr {
        match node {
            Node::Attr(attr) => attr,
            other => panic!("expected attr, got {}", other.kind()),
        }
    }

    #[test]
    fn test_raw() {
        let nodes = parse("hello world");
        assert_eq!(nodes.len(), 1);
        assert!(matches!(&nodes[0], Node::Raw(raw) if raw.content == "hello world"));
    }

    #[test]
    fn test_nested_tags() {
        let nodes = parse("<a><b>x</b>y</a>");
        let a = tag(&nodes[0]);
        assert_eq!(a.name, "a");
        assert_eq!(a.nodes.len(), 2);
        assert_eq!(tag(&a.nodes[0]).name, "b");
    }

    #[test]
    fn test_attributes() {
        let nodes = parse("<input type=\"text\" checked value=x>");
        let input = tag(&nodes[0]);
        assert!(input.void);
        assert!(!input.self_closing);
        assert_eq!(input.attrs.len(), 3);

        assert_eq!(input.attr_text("type").as_deref(), Some("text"));
        assert_eq!(attr(&input.attrs[1]).value, None);
        assert_eq!(input.attr_text("value").as_deref(), Some("x"));
    }

    #[test]
    fn test_self_closing() {
        let nodes = parse("<block:title/>");
        let block = tag(&nodes[0]);
        assert!(block.void);
        assert!(block.self_closing);
    }

    #[test]
    fn test_dynamic_attribute_value() {
        let nodes = parse("<a href=\"{{ $url }}\">x</a>");
        let a = tag(&nodes[0]);
        let Some(Value::Node(value)) = &attr(&a.attrs[0]).value else {
            panic!("expected node value");
        };
        let Node::Mixin(mixin) = value.as_ref() else {
            panic!("expected mixin");
        };
        let kinds: Vec<_> = mixin.nodes.iter().map(Node::kind).collect();
        assert_eq!(
            kinds,
            vec![quire_ast::NodeKind::Raw, quire_ast::NodeKind::Output, quire_ast::NodeKind::Raw]
        );
    }

    #[test]
    fn test_verbatim_attribute() {
        let nodes = parse("<b onclick=\"go()\" style=\"color:red\"></b>");
        let b = tag(&nodes[0]);
        for node in &b.attrs {
            assert!(matches!(
                &attr(node).value,
                Some(Value::Node(value)) if matches!(value.as_ref(), Node::Verbatim(_))
            ));
        }
    }

    #[test]
    fn test_script_body_is_verbatim() {
        let nodes = parse("<script>if (a < b) {}</script>");
        let script = tag(&nodes[0]);
        assert!(matches!(&script.nodes[0], Node::Verbatim(v) if v.nodes.len() == 1));
    }

    #[test]
    fn test_output() {
        let nodes = parse("{{ $a }}{!! $b !!}");
        let Node::Output(escaped) = &nodes[0] else {
            panic!("expected output");
        };
        assert_eq!(escaped.body, " $a ");
        assert!(!escaped.raw);
        assert!(matches!(&nodes[1], Node::Output(raw) if raw.raw && raw.body == " $b "));
    }

    #[test]
    fn test_directive() {
        let nodes = parse("@foreach($items as $k => $v)x@endforeach");
        let Node::Directive(open) = &nodes[0] else {
            panic!("expected directive");
        };
        assert_eq!(open.name, "foreach");
        assert_eq!(open.body.as_deref(), Some("$items as $k => $v"));
        assert_eq!(open.values, vec!["$items as $k => $v"]);
        assert_eq!(open.context.as_ref().and_then(|c| c.offset()), Some(0));
        assert!(matches!(&nodes[2], Node::Directive(end) if end.body.is_none()));
    }

    #[test]
    fn test_directive_values() {
        let nodes = parse("@json($data, JSON_PRETTY_PRINT)");
        let Node::Directive(json) = &nodes[0] else {
            panic!("expected directive");
        };
        assert_eq!(json.values, vec!["$data", "JSON_PRETTY_PRINT"]);
    }

    #[test]
    fn test_unbalanced_directive_body() {
        let err = Parser::default().parse("@if($a[0)", None).unwrap_err();
        assert!(matches!(err, ParserError::Syntax { .. }));
        assert_eq!(err.offset(), Some(0));
    }

    #[test]
    fn test_inline_block() {
        let nodes = parse("${title|Hello}");
        let Node::Block(block) = &nodes[0] else {
            panic!("expected block");
        };
        assert_eq!(block.name.as_deref(), Some("title"));
        assert!(matches!(&block.nodes[0], Node::Raw(raw) if raw.content == "Hello"));
    }

    #[test]
    fn test_php() {
        let nodes = parse("<?php echo 1; ?>");
        let Node::Php(php) = &nodes[0] else {
            panic!("expected php");
        };
        assert_eq!(php.content, "<?php echo 1; ?>");
        assert_eq!(php.tokens.len(), 3);
    }

    #[test]
    fn test_mismatched_close() {
        let err = Parser::default().parse("<a><b></a>", Some("page")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid closing tag `a`, expected `b` opened at offset 3"
        );
        assert_eq!(err.offset(), Some(6));
    }

    #[test]
    fn test_close_without_open() {
        let err = Parser::default().parse("x</a>", None).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected closing tag `a`");
    }

    #[test]
    fn test_unclosed() {
        let err = Parser::default().parse("<div><p></p>", None).unwrap_err();
        assert_eq!(err.to_string(), "Unclosed tag `div`");
        assert_eq!(err.offset(), Some(0));
    }

    #[test]
    fn test_scanner_error() {
        let err = Parser::default().parse("<p>@foo(bar</p>", Some("x")).unwrap_err();
        assert!(matches!(err, ParserError::Scanner { .. }));
        assert_eq!(err.offset(), Some(3));
    }

    #[test]
    fn test_unknown_grammar() {
        let lexer = Lexer::new().with_grammar(HtmlGrammar);
        let err = Parser::new(lexer).parse("<b>", None).unwrap_err();
        assert_eq!(err.to_string(), "Undefined token grammar `html`");
    }

    #[test]
    fn test_context_path() {
        let template = Parser::default().parse("x", Some("home")).unwrap();
        assert_eq!(template.context.as_ref().and_then(|c| c.path()), Some("home"));
        assert_eq!(template.nodes[0].context().and_then(|c| c.path()), Some("home"));
    }
}
