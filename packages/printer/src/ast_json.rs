//! JSON serialization of the parsed tree, for tooling and the CLI `parse`
//! command.

use astro_parser::{Attribute, AttributeKind, Document, NodeId, NodeKind};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AstNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AstAttribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AstNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AstAttribute {
    pub kind: String,
    pub name: String,
    pub value: String,
}

/// Serialize a document tree as JSON.
pub fn print_to_json(doc: &Document) -> serde_json::Result<String> {
    serde_json::to_string(&convert(doc, Document::ROOT))
}

pub fn print_to_json_pretty(doc: &Document) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&convert(doc, Document::ROOT))
}

fn convert(doc: &Document, id: NodeId) -> AstNode {
    let node = doc.node(id);
    let (node_type, name, value) = match node.kind {
        NodeKind::Document => ("root", None, None),
        NodeKind::Element => ("element", Some(node.data.clone()), None),
        NodeKind::Component if node.data == "Fragment" => {
            ("fragment", Some(node.data.clone()), None)
        }
        NodeKind::Component => ("component", Some(node.data.clone()), None),
        NodeKind::CustomElement => ("custom-element", Some(node.data.clone()), None),
        NodeKind::Text => ("text", None, Some(node.data.clone())),
        NodeKind::Comment => ("comment", None, Some(node.data.clone())),
        NodeKind::Doctype => ("doctype", None, Some(node.data.clone())),
        NodeKind::Frontmatter => ("frontmatter", None, Some(node.data.clone())),
        NodeKind::Expression => ("expression", None, None),
    };
    AstNode {
        node_type: node_type.to_string(),
        name,
        value,
        attributes: node.attributes.iter().map(convert_attribute).collect(),
        children: doc.children(id).map(|c| convert(doc, c)).collect(),
    }
}

fn convert_attribute(attr: &Attribute) -> AstAttribute {
    let kind = match attr.kind {
        AttributeKind::Empty => "empty",
        AttributeKind::Quoted => "quoted",
        AttributeKind::Expression => "expression",
        AttributeKind::Shorthand => "shorthand",
        AttributeKind::Spread => "spread",
        AttributeKind::TemplateLiteral => "template-literal",
    };
    AstAttribute {
        kind: kind.to_string(),
        name: attr.name.clone(),
        value: attr.value.clone(),
    }
}
