use crate::ast::{
    is_component_name, is_custom_element_name, is_void_element, Document, NodeId, NodeKind, Span,
};
use crate::error::{ParseAnomaly, ParseResult};
use crate::tokenizer::{Token, Tokenizer};
use tracing::warn;

/// Tree builder for component files.
///
/// Consumes the tokenizer pull-style and applies the restricted insertion
/// rules of the template language: the author controls `<html>`/`<head>`/
/// `<body>` structure, `<table>` never synthesizes `<tbody>`, void elements
/// never take children, and component/custom-element tags are preserved
/// verbatim.
pub struct Parser<'src> {
    tokenizer: Tokenizer<'src>,
    doc: Document,
    stack: Vec<NodeId>,
}

/// Parse a source document into a tree.
pub fn parse(source: &str) -> ParseResult<Document> {
    Parser::new(source).parse_document()
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            tokenizer: Tokenizer::new(source),
            doc: Document::new(),
            stack: vec![Document::ROOT],
        }
    }

    pub fn parse_document(mut self) -> ParseResult<Document> {
        while let Some(token) = self.tokenizer.next_token()? {
            self.process(token);
        }
        Ok(self.doc)
    }

    fn top(&self) -> NodeId {
        *self.stack.last().expect("stack always holds the root")
    }

    fn process(&mut self, token: Token<'src>) {
        match token {
            Token::Text { text, span } => {
                let top = self.top();
                if self.doc.node(top).kind == NodeKind::Frontmatter {
                    let node = self.doc.node_mut(top);
                    node.data.push_str(text);
                    node.span.end = span.end;
                } else {
                    let id = self.doc.create(NodeKind::Text, text, span);
                    self.doc.append_child(top, id);
                }
            }
            Token::Comment { text, span } => {
                let id = self.doc.create(NodeKind::Comment, text, span);
                let top = self.top();
                self.doc.append_child(top, id);
            }
            Token::Doctype { name, known, span } => {
                if !known {
                    warn!(value = %name, offset = span.start, "unknown doctype");
                    self.doc.anomalies.push(ParseAnomaly::UnknownDoctype {
                        value: name.clone(),
                        span,
                    });
                }
                let id = self.doc.create(NodeKind::Doctype, name, span);
                let top = self.top();
                self.doc.append_child(top, id);
            }
            Token::FrontmatterStart { span } => {
                let id = self.doc.create(
                    NodeKind::Frontmatter,
                    "",
                    Span::empty(span.end),
                );
                self.doc.append_child(Document::ROOT, id);
                self.stack.push(id);
            }
            Token::FrontmatterEnd { .. } => {
                if self.doc.node(self.top()).kind == NodeKind::Frontmatter {
                    self.stack.pop();
                }
            }
            Token::ExpressionStart { span } => {
                let id = self.doc.create(NodeKind::Expression, "", span);
                let top = self.top();
                self.doc.append_child(top, id);
                self.stack.push(id);
            }
            Token::ExpressionEnd { span } => {
                if self.doc.node(self.top()).kind == NodeKind::Expression {
                    let top = self.top();
                    self.doc.node_mut(top).span.end = span.end;
                    self.stack.pop();
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
                span,
            } => {
                self.insert_element(name, attributes, self_closing, span);
            }
            Token::EndTag { name, span } => {
                self.close_element(name, span);
            }
        }
    }

    fn insert_element(
        &mut self,
        name: &str,
        attributes: Vec<crate::ast::Attribute>,
        self_closing: bool,
        span: Span,
    ) {
        let kind = if is_component_name(name) {
            NodeKind::Component
        } else if is_custom_element_name(name) {
            NodeKind::CustomElement
        } else {
            NodeKind::Element
        };
        let data = if name.is_empty() { "Fragment" } else { name };

        let attributes = self.dedupe_attributes(attributes);
        let id = self.doc.create(kind, data, span);
        self.doc.node_mut(id).attributes = attributes;
        let top = self.top();
        self.doc.append_child(top, id);

        let void = kind == NodeKind::Element && is_void_element(&name.to_ascii_lowercase());
        if !self_closing && !void {
            self.stack.push(id);
        }
    }

    /// Attribute keys are unique per element; on a duplicate the later value
    /// wins and the collision is recorded.
    fn dedupe_attributes(
        &mut self,
        attributes: Vec<crate::ast::Attribute>,
    ) -> Vec<crate::ast::Attribute> {
        let mut out: Vec<crate::ast::Attribute> = Vec::with_capacity(attributes.len());
        for attr in attributes {
            if !attr.name.is_empty() {
                if let Some(existing) = out.iter().position(|a| a.name == attr.name) {
                    warn!(name = %attr.name, offset = attr.name_span.start, "duplicate attribute");
                    self.doc.anomalies.push(ParseAnomaly::DuplicateAttribute {
                        name: attr.name.clone(),
                        span: attr.name_span,
                    });
                    out.remove(existing);
                }
            }
            out.push(attr);
        }
        out
    }

    fn close_element(&mut self, name: &str, span: Span) {
        let normalized = if name.is_empty() { "Fragment" } else { name };

        // Search open elements top-down; expressions are hard boundaries so
        // an end tag inside `{…}` can never close an element outside it.
        let mut matched = None;
        for (depth, id) in self.stack.iter().enumerate().skip(1).rev() {
            let node = self.doc.node(*id);
            match node.kind {
                NodeKind::Expression | NodeKind::Frontmatter => break,
                _ => {
                    let hit = node.data == normalized
                        || (node.kind == NodeKind::Element
                            && node.data.eq_ignore_ascii_case(normalized));
                    if hit {
                        matched = Some((depth, *id));
                        break;
                    }
                }
            }
        }

        match matched {
            Some((depth, id)) => {
                // Anything above the match is implicitly closed
                self.stack.truncate(depth);
                self.doc.node_mut(id).span.end = span.end;
            }
            None => {
                warn!(name = normalized, offset = span.start, "unexpected end tag");
                self.doc.anomalies.push(ParseAnomaly::UnexpectedEndTag {
                    name: normalized.to_string(),
                    span,
                });
            }
        }
    }
}
