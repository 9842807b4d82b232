//! Tree-rewriting passes between parsing and printing.
//!
//! The pipeline runs in a fixed order: style extraction and scoping, head
//! injection, frontmatter hoist analysis, script analysis, component
//! analysis. Each pass mutates the tree and/or fills the side channels on
//! [`TransformContext`]; the printer consumes both.

pub mod component;
pub mod css;
pub mod head;
pub mod hoist;
pub mod js_scanner;
pub mod scope;
pub mod script;
pub mod styles;

use astro_parser::{hash_from_source, Document, NodeId};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::instrument;

pub use component::analyze_components;
pub use head::{inject_head, RENDER_HEAD_MARKER};
pub use hoist::analyze_frontmatter;
pub use js_scanner::{ImportBinding, ImportStatement};
pub use scope::{scope_element, scope_elements, SCOPE_ATTRIBUTE};
pub use script::analyze_scripts;
pub use styles::extract_styles;

/// Caller-facing options for a single compile.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Override for the 8-character scope hash; derived from the source when
    /// absent
    pub scope: Option<String>,
    /// Site URL injected into the `createAstro` call
    pub site: String,
    /// Base URL the emitted module imports the runtime from
    pub internal_url: String,
    /// Project root injected into the `createAstro` call
    pub project_root: String,
    /// When true, hoisted scripts are carried only on the side channels
    /// instead of being re-emitted in the module prelude
    pub static_extraction: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            scope: None,
            site: String::new(),
            internal_url: "astro/internal".to_string(),
            project_root: ".".to_string(),
            static_extraction: false,
        }
    }
}

/// A script lifted out of the per-render template into module scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HoistedScript {
    Inline { value: String },
    Remote { src: String },
}

/// One frontmatter import surfaced in compile metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleImport {
    pub specifier: String,
    pub assertion: Option<String>,
}

/// Metadata the emitted module publishes via `createMetadata` and the
/// compiler returns to its caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub modules: Vec<ModuleImport>,
    pub hydrated_components: Vec<String>,
    pub client_only_components: Vec<String>,
    pub hydration_directives: Vec<String>,
    pub hoisted: Vec<HoistedScript>,
}

/// Non-fatal findings recorded during transformation.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum TransformWarning {
    #[error("client:only component '{component}' has no matching import")]
    ClientOnlyWithoutImport { component: String },

    #[error("unknown hydration directive 'client:{directive}' on '{component}'")]
    UnknownHydrationDirective { directive: String, component: String },
}

/// Hydration facts the printer needs per component node.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInfo {
    pub directive: Option<String>,
    pub client_only: bool,
    pub specifier: Option<String>,
    pub export_name: Option<String>,
}

/// Per-compile side channels. All mutable pipeline state lives here; nothing
/// is shared between documents.
#[derive(Debug, Default)]
pub struct TransformContext {
    /// The document's scope hash
    pub scope: String,
    /// Extracted style elements, detached from the tree but alive in the
    /// arena, in source order
    pub styles: Vec<NodeId>,
    /// Hoisted script elements, detached likewise
    pub scripts: Vec<NodeId>,
    /// `define:vars` expressions keyed by script node
    pub define_vars_scripts: HashMap<NodeId, String>,
    /// Extracted `getStaticPaths` export text and its source offset
    pub get_static_paths: Option<String>,
    pub get_static_paths_offset: Option<usize>,
    /// Frontmatter segment rendered at module scope (imports)
    pub frontmatter_module: String,
    pub frontmatter_module_offset: Option<usize>,
    /// Frontmatter segment rendered inside the component body
    pub frontmatter_render: String,
    pub frontmatter_render_offset: Option<usize>,
    /// Scanned frontmatter imports, in source order
    pub imports: Vec<ImportStatement>,
    /// Per-component hydration analysis
    pub components: HashMap<NodeId, ComponentInfo>,
    pub metadata: Metadata,
    pub warnings: Vec<TransformWarning>,
}

impl TransformContext {
    pub fn new(scope: String) -> Self {
        Self {
            scope,
            ..Default::default()
        }
    }
}

/// Run the full pass pipeline over a parsed document.
#[instrument(skip(doc, source, options), fields(source_len = source.len()))]
pub fn transform(
    doc: &mut Document,
    source: &str,
    options: &TransformOptions,
) -> TransformContext {
    let scope = options
        .scope
        .clone()
        .unwrap_or_else(|| hash_from_source(source));
    let mut ctx = TransformContext::new(scope);

    extract_styles(doc, &mut ctx);
    inject_head(doc);
    analyze_frontmatter(doc, &mut ctx);
    analyze_scripts(doc, &mut ctx);
    analyze_components(doc, &mut ctx);

    // modules metadata: every frontmatter import except client-only ones,
    // which the bundler must skip
    for import in &ctx.imports {
        if ctx
            .metadata
            .client_only_components
            .contains(&import.specifier)
        {
            continue;
        }
        ctx.metadata.modules.push(ModuleImport {
            specifier: import.specifier.clone(),
            assertion: import.assertion.clone(),
        });
    }

    ctx
}
