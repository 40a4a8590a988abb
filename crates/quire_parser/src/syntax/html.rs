use std::sync::Arc;

use quire_ast::{Attr, Context, Node, Raw, Tag, Value};
use quire_lexer::grammar::HtmlGrammar;
use quire_lexer::{Token, TokenKind};

use super::Syntax;
use crate::assembler::Assembler;
use crate::error::ParserError;
use crate::parser::Session;

/// Elements without a closing tag.
const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Attributes whose values hold CSS or script.
fn is_verbatim_attr(name: &str) -> bool {
    name == "style" || name.starts_with("on")
}

/// HTML tags and attributes.
#[derive(Debug, Default)]
pub struct HtmlSyntax {
    tag: Option<Tag>,
    /// The tag was opened with `</`.
    closing: bool,
    /// Index of the attribute waiting for a value.
    attr: Option<usize>,
    expect_value: bool,
    /// Whitespace seen since the last name or value inside the tag.
    spacing: String,
}

impl HtmlSyntax {
    fn flush(&mut self) -> Option<Tag> {
        self.closing = false;
        self.attr = None;
        self.expect_value = false;
        self.spacing.clear();
        self.tag.take()
    }

    /// Keeps the whitespace before `>` or `/>` on the open tag.
    fn take_trailing(&mut self) {
        if let Some(tag) = self.tag.as_mut() {
            tag.trailing = std::mem::take(&mut self.spacing);
        }
    }

    fn current_attr(&mut self) -> Option<&mut Attr> {
        let index = self.attr?;
        match self.tag.as_mut()?.attrs.get_mut(index)? {
            Node::Attr(attr) => Some(attr),
            _ => None,
        }
    }

    fn keyword(&mut self, session: &Session<'_>, token: Token) -> Result<(), ParserError> {
        let context = session.context(&token);
        let Some(tag) = self.tag.as_mut() else {
            return Err(unexpected(&token, context));
        };

        if tag.name.is_empty() {
            tag.name = token.content;
            return Ok(());
        }

        if self.expect_value {
            let value = session.parse_token(token)?;
            if let Some(attr) = self.current_attr() {
                attr.value = Some(value);
            }
            self.attr = None;
            self.expect_value = false;
            return Ok(());
        }

        let name = session.parse_token(token)?;
        let mut attr = Attr::new(name, None, Some(context));
        attr.spacing = Some(std::mem::take(&mut self.spacing));
        tag.attrs.push(attr.into());
        self.attr = Some(tag.attrs.len() - 1);
        Ok(())
    }

    fn value(&mut self, session: &Session<'_>, token: Token) -> Result<(), ParserError> {
        let verbatim = match self.current_attr() {
            Some(attr) => attr.name.as_text().is_some_and(is_verbatim_attr),
            None => return Err(unexpected(&token, session.context(&token))),
        };

        let value = if verbatim {
            Value::from(Node::Verbatim(session.parse_verbatim(token)?))
        } else {
            session.parse_token(token)?
        };

        if let Some(attr) = self.current_attr() {
            attr.value = Some(value);
        }
        self.attr = None;
        self.expect_value = false;
        Ok(())
    }

    fn close(&mut self, asm: &mut Assembler, token: &Token) -> Result<(), ParserError> {
        let closing = self.closing;
        self.take_trailing();
        let Some(mut tag) = self.flush() else {
            return Err(ParserError::syntax(
                format!("Unexpected `{}`", token.content),
                None,
            ));
        };

        if closing {
            return match asm.current_tag() {
                Some(open) if open.name == tag.name => {
                    asm.close();
                    Ok(())
                }
                Some(open) => {
                    let at = open
                        .context
                        .as_ref()
                        .and_then(|c| c.offset())
                        .map(|offset| format!(" opened at offset {offset}"))
                        .unwrap_or_default();
                    Err(ParserError::syntax(
                        format!("Invalid closing tag `{}`, expected `{}`{at}", tag.name, open.name),
                        tag.context,
                    ))
                }
                None => Err(ParserError::syntax(
                    format!("Unexpected closing tag `{}`", tag.name),
                    tag.context,
                )),
            };
        }

        if VOID_TAGS.contains(&tag.name.to_lowercase().as_str()) {
            tag.void = true;
            asm.push(tag.into());
        } else {
            asm.open(tag);
        }
        Ok(())
    }
}

impl Syntax for HtmlSyntax {
    fn handle(
        &mut self,
        session: &Session<'_>,
        asm: &mut Assembler,
        token: Token,
    ) -> Result<(), ParserError> {
        match token.kind {
            HtmlGrammar::OPEN | HtmlGrammar::OPEN_SHORT => {
                self.flush();
                self.closing = token.kind == HtmlGrammar::OPEN_SHORT;
                self.tag = Some(Tag::new(String::new(), Some(session.context(&token))));
            }
            HtmlGrammar::KEYWORD => self.keyword(session, token)?,
            HtmlGrammar::EQUAL => {
                if self.attr.is_none() {
                    return Err(unexpected(&token, session.context(&token)));
                }
                self.spacing.clear();
                self.expect_value = true;
            }
            HtmlGrammar::ATTRIBUTE => self.value(session, token)?,
            HtmlGrammar::CLOSE_SHORT => {
                self.take_trailing();
                if let Some(mut tag) = self.flush() {
                    tag.void = true;
                    tag.self_closing = true;
                    asm.push(tag.into());
                }
            }
            HtmlGrammar::CLOSE => self.close(asm, &token)?,
            // spacing between `<` and the name, or around `=`, is not kept
            HtmlGrammar::WHITESPACE => {
                let named = self.tag.as_ref().is_some_and(|tag| !tag.name.is_empty());
                if named && !self.expect_value {
                    self.spacing.push_str(&token.content);
                }
            }
            HtmlGrammar::VERBATIM => {
                let verbatim = session.parse_verbatim(token)?;
                asm.push(verbatim.into());
            }
            // text between nested tokens of an attribute or verbatim body
            TokenKind::RAW => {
                let context = session.context(&token);
                asm.push(Raw::new(token.content, Some(context)).into());
            }
            _ => {}
        }
        Ok(())
    }
}

fn unexpected(token: &Token, context: Arc<Context>) -> ParserError {
    ParserError::syntax(format!("Unexpected attribute token `{}`", token.content), Some(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parser;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("style", true)]
    #[case("onclick", true)]
    #[case("class", false)]
    #[case("data-on", false)]
    fn test_verbatim_attr(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_verbatim_attr(name), expected);
    }

    #[test]
    fn test_void_tag_is_case_insensitive() {
        let template = Parser::default().parse("<BR>text", None).unwrap();
        assert!(matches!(&template.nodes[0], Node::Tag(tag) if tag.void && tag.name == "BR"));
        assert_eq!(template.nodes.len(), 2);
    }

    #[test]
    fn test_dynamic_attribute_name() {
        let template = Parser::default()
            .parse("<input {!! $value ? \"checked\" : \"\" !!}>", None)
            .unwrap();
        let Node::Tag(input) = &template.nodes[0] else {
            panic!("expected tag");
        };
        let Node::Attr(attr) = &input.attrs[0] else {
            panic!("expected attr");
        };
        assert!(matches!(&attr.name, Value::Node(node) if matches!(node.as_ref(), Node::Mixin(_))));
        assert_eq!(attr.value, None);
    }

    #[test]
    fn test_php_attribute_value() {
        let template = Parser::default().parse("<b class=<?='red'?>></b>", None).unwrap();
        let Node::Tag(b) = &template.nodes[0] else {
            panic!("expected tag");
        };
        let Node::Attr(class) = &b.attrs[0] else {
            panic!("expected attr");
        };
        let Some(Value::Node(value)) = &class.value else {
            panic!("expected node value");
        };
        let Node::Mixin(mixin) = value.as_ref() else {
            panic!("expected mixin");
        };
        assert!(matches!(&mixin.nodes[0], Node::Php(php) if php.content == "<?='red'?>"));
    }

    #[test]
    fn test_tag_spacing() {
        let template = Parser::default()
            .parse("<div\n  class = \"a\"\tid=\"b\" >x</div>", None)
            .unwrap();
        let Node::Tag(div) = &template.nodes[0] else {
            panic!("expected tag");
        };
        let spacing: Vec<_> = div
            .attrs
            .iter()
            .map(|node| match node {
                Node::Attr(attr) => attr.spacing.as_deref(),
                _ => None,
            })
            .collect();
        assert_eq!(spacing, vec![Some("\n  "), Some("\t")]);
        assert_eq!(div.trailing, " ");
    }

    #[test]
    fn test_self_closing_spacing() {
        let template = Parser::default().parse("<img src=\"x\"  />", None).unwrap();
        let Node::Tag(img) = &template.nodes[0] else {
            panic!("expected tag");
        };
        assert!(img.self_closing);
        assert_eq!(img.trailing, "  ");
    }

    #[test]
    fn test_attribute_without_name() {
        let err = Parser::default().parse("<a \"x\">", None).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected attribute token `\"x\"`");
    }
}
