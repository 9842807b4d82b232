//! Style extraction: rewrite scoped CSS, collect styles onto the side
//! channel, and tag candidate elements with the scope.

use crate::css::scope_css;
use crate::scope::scope_elements;
use crate::TransformContext;
use astro_parser::{Attribute, AttributeKind, Document, NodeId, NodeKind, Span};
use tracing::debug;

/// Extract every `<style>` element (except those inside `<svg>`, which render
/// inline) onto the styles channel, rewriting scoped CSS in place. Elements
/// are tagged with the scope when at least one scoped style exists.
pub fn extract_styles(doc: &mut Document, ctx: &mut TransformContext) {
    let styles: Vec<NodeId> = doc
        .descendants(Document::ROOT)
        .filter(|id| doc.node(*id).is_element_named("style"))
        .filter(|id| !has_svg_ancestor(doc, *id))
        .collect();

    let mut any_scoped = false;
    for id in &styles {
        let global = doc.node(*id).has_attribute("is:global");
        if !global {
            any_scoped = true;
            rewrite_style_css(doc, *id, &ctx.scope);
            let scope = ctx.scope.clone();
            let end = doc.node(*id).span.end;
            doc.node_mut(*id).attributes.push(Attribute {
                name: "data-astro-id".to_string(),
                value: scope,
                kind: AttributeKind::Quoted,
                name_span: Span::empty(end),
                value_span: Span::empty(end),
            });
        }
        debug!(style = id.0, global, "extracted style");
        doc.detach(*id);
        ctx.styles.push(*id);
    }

    if any_scoped {
        scope_elements(doc, &ctx.scope.clone());
    }
}

fn rewrite_style_css(doc: &mut Document, style: NodeId, scope: &str) {
    let children: Vec<NodeId> = doc.children(style).collect();
    for child in children {
        if doc.node(child).kind == NodeKind::Text {
            let scoped = scope_css(&doc.node(child).data, scope);
            doc.node_mut(child).data = scoped;
        }
    }
}

fn has_svg_ancestor(doc: &Document, id: NodeId) -> bool {
    let mut current = doc.node(id).parent;
    while let Some(parent) = current {
        if doc.node(parent).is_element_named("svg") {
            return true;
        }
        current = doc.node(parent).parent;
    }
    false
}
