//! Component analysis: hydration directives and import origins.

use crate::{ComponentInfo, TransformContext, TransformWarning};
use astro_parser::{Document, NodeId, NodeKind};
use tracing::{debug, warn};

pub const HYDRATION_DIRECTIVES: &[&str] = &["load", "idle", "visible", "media", "only"];

pub fn analyze_components(doc: &Document, ctx: &mut TransformContext) {
    let components: Vec<NodeId> = doc
        .descendants(Document::ROOT)
        .filter(|id| {
            matches!(
                doc.node(*id).kind,
                NodeKind::Component | NodeKind::CustomElement
            )
        })
        .collect();

    for id in components {
        let node = doc.node(id);
        let name = node.data.clone();
        if name == "Fragment" {
            // rendered via the runtime identifier; no resolution applies
            continue;
        }
        let custom_element = node.kind == NodeKind::CustomElement;

        let mut directive = None;
        for attr in &node.attributes {
            let Some(rest) = attr.name.strip_prefix("client:") else {
                continue;
            };
            if HYDRATION_DIRECTIVES.contains(&rest) {
                directive = Some(rest.to_string());
                break;
            }
            warn!(component = %name, directive = rest, "unknown hydration directive");
            ctx.warnings.push(TransformWarning::UnknownHydrationDirective {
                directive: rest.to_string(),
                component: name.clone(),
            });
        }

        // resolve the import origin of the binding in use
        let root = name.split('.').next().unwrap_or(&name);
        let member = name.split_once('.').map(|(_, m)| m);
        let mut specifier = None;
        let mut export_name = None;
        if custom_element {
            export_name = Some("default".to_string());
        } else {
            for import in &ctx.imports {
                if let Some(export) = import.resolve(root, member) {
                    specifier = Some(import.specifier.clone());
                    export_name = Some(export);
                    break;
                }
            }
        }

        let Some(directive) = directive else {
            ctx.components.insert(
                id,
                ComponentInfo {
                    directive: None,
                    client_only: false,
                    specifier,
                    export_name,
                },
            );
            continue;
        };

        let client_only = directive == "only";
        debug!(component = %name, directive = %directive, client_only, "hydrated component");
        if !ctx.metadata.hydration_directives.contains(&directive) {
            ctx.metadata.hydration_directives.push(directive.clone());
        }

        if client_only {
            match &specifier {
                Some(spec) => {
                    if !ctx.metadata.client_only_components.contains(spec) {
                        ctx.metadata.client_only_components.push(spec.clone());
                    }
                }
                None if !custom_element => {
                    warn!(component = %name, "client:only component has no matching import");
                    ctx.warnings.push(TransformWarning::ClientOnlyWithoutImport {
                        component: name.clone(),
                    });
                }
                None => {}
            }
        } else {
            let value = if custom_element {
                format!("'{}'", name)
            } else {
                name.clone()
            };
            if !ctx.metadata.hydrated_components.contains(&value) {
                ctx.metadata.hydrated_components.push(value);
            }
        }

        ctx.components.insert(
            id,
            ComponentInfo {
                directive: Some(directive),
                client_only,
                specifier,
                export_name,
            },
        );
    }
}
