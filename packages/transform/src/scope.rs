//! Element scoping: tag every candidate element with the document scope.

use astro_parser::{Attribute, AttributeKind, Document, NodeId, NodeKind, Span};

/// The attribute carrying the scope hash on scoped elements.
pub const SCOPE_ATTRIBUTE: &str = "data-astro-scope";

/// Elements that never receive the scope attribute. `html` is a notable
/// omission: it is scoped as an element but never as a CSS selector.
pub const NEVER_SCOPED_ELEMENTS: &[&str] = &[
    "Fragment", "base", "body", "font", "frame", "frameset", "head", "link", "meta", "noframes",
    "noscript", "script", "style", "title",
];

/// Walk the document pre-order and scope every candidate element.
pub fn scope_elements(doc: &mut Document, scope: &str) {
    let candidates: Vec<NodeId> = doc
        .descendants(Document::ROOT)
        .filter(|id| {
            let node = doc.node(*id);
            matches!(
                node.kind,
                NodeKind::Element | NodeKind::Component | NodeKind::CustomElement
            ) && !NEVER_SCOPED_ELEMENTS.contains(&node.data.as_str())
        })
        .collect();
    for id in candidates {
        scope_element(doc, id, scope);
    }
}

/// Apply the scope to one element, merging with an existing scope attribute
/// per its kind. Guarded by the node's `scoped` flag, so a second application
/// never changes attributes.
pub fn scope_element(doc: &mut Document, id: NodeId, scope: &str) {
    if doc.node(id).scoped {
        return;
    }
    let component = doc.node(id).component;
    let node = doc.node_mut(id);

    for attr in node.attributes.iter_mut() {
        if attr.name != SCOPE_ATTRIBUTE {
            continue;
        }
        match attr.kind {
            AttributeKind::Shorthand => {
                if component {
                    attr.value = format!("{} + \"{}\"", attr.name, scope);
                    attr.kind = AttributeKind::Expression;
                    node.scoped = true;
                    return;
                }
            }
            AttributeKind::Empty => {
                attr.kind = AttributeKind::Quoted;
                attr.value = scope.to_string();
                node.scoped = true;
                return;
            }
            AttributeKind::Quoted | AttributeKind::TemplateLiteral => {
                attr.value = format!("{} {}", attr.value, scope);
                node.scoped = true;
                return;
            }
            AttributeKind::Expression => {
                attr.value = format!("({}) + \" {}\"", attr.value, scope);
                node.scoped = true;
                return;
            }
            _ => {}
        }
    }

    node.attributes.push(Attribute {
        name: SCOPE_ATTRIBUTE.to_string(),
        value: scope.to_string(),
        kind: AttributeKind::Quoted,
        name_span: Span::empty(node.span.end),
        value_span: Span::empty(node.span.end),
    });
    node.scoped = true;
}
