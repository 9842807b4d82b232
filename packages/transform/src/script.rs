//! Script analysis: hoist, inline, and `define:vars` handling.

use crate::{HoistedScript, TransformContext};
use astro_parser::{Attribute, AttributeKind, Document, NodeId, Span};
use tracing::debug;

pub fn analyze_scripts(doc: &mut Document, ctx: &mut TransformContext) {
    let scripts: Vec<NodeId> = doc
        .descendants(Document::ROOT)
        .filter(|id| doc.node(*id).is_element_named("script"))
        .collect();

    for id in scripts {
        if doc.node(id).has_attribute("is:inline") {
            // emitted unchanged; the marker itself is compile-time only
            doc.node_mut(id).attributes.retain(|a| a.name != "is:inline");
            continue;
        }

        if doc.node(id).has_attribute("hoist") {
            let hoisted = match doc.node(id).attribute("src") {
                Some(src) => HoistedScript::Remote {
                    src: src.value.clone(),
                },
                None => HoistedScript::Inline {
                    value: doc.text_content(id),
                },
            };
            debug!(script = id.0, ?hoisted, "hoisting script");
            ctx.metadata.hoisted.push(hoisted);
            ctx.scripts.push(id);
            doc.detach(id);
            continue;
        }

        if let Some(vars) = doc.node(id).attribute("define:vars") {
            if vars.kind == AttributeKind::Expression {
                ctx.define_vars_scripts.insert(id, vars.value.clone());
                let end = doc.node(id).span.end;
                let node = doc.node_mut(id);
                node.attributes.retain(|a| a.name != "define:vars");
                // script vars force a module script
                match node.attributes.iter_mut().find(|a| a.name == "type") {
                    Some(ty) => {
                        ty.kind = AttributeKind::Quoted;
                        ty.value = "module".to_string();
                    }
                    None => node.attributes.push(Attribute {
                        name: "type".to_string(),
                        value: "module".to_string(),
                        kind: AttributeKind::Quoted,
                        name_span: Span::empty(end),
                        value_span: Span::empty(end),
                    }),
                }
            }
        }
    }
}
