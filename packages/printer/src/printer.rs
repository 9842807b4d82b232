//! Depth-first emission of a transformed document as a JavaScript module.
//!
//! The printer walks the tree once, maintaining the output buffer and the
//! parallel sourcemap chunk. Two escaping contexts apply at any moment:
//! HTML text inside the render template literal is backslash-escaped for
//! backticks and `${`, while text inside an embedded expression is emitted
//! verbatim (it is already JavaScript).

use crate::runtime::*;
use crate::sourcemap::{LineIndex, SourcemapBuilder};
use astro_parser::{
    is_void_element, Attribute, AttributeKind, Document, NodeId, NodeKind, Span,
};
use astro_transform::{ComponentInfo, HoistedScript, TransformContext, TransformOptions};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrintError {
    #[error("printer invariant violated at byte {}: {message}", span.start)]
    InvariantViolation { message: String, span: Span },
}

pub type PrintJsResult<T> = Result<T, PrintError>;

/// Emitted module plus the raw sourcemap chunk.
#[derive(Debug, Clone)]
pub struct PrintResult {
    pub output: String,
    pub source_map_chunk: String,
}

/// Print a transformed document to its JavaScript module.
#[instrument(skip_all, fields(nodes = doc.len()))]
pub fn print_to_js(
    source: &str,
    doc: &Document,
    ctx: &TransformContext,
    options: &TransformOptions,
) -> PrintJsResult<PrintResult> {
    let mut printer = Printer {
        source,
        doc,
        ctx,
        options,
        out: String::with_capacity(source.len() * 2),
        map: SourcemapBuilder::new(),
        lines: LineIndex::new(source),
    };
    printer.print_module()?;
    Ok(PrintResult {
        output: printer.out,
        source_map_chunk: printer.map.into_chunk(),
    })
}

struct Printer<'a> {
    source: &'a str,
    doc: &'a Document,
    ctx: &'a TransformContext,
    options: &'a TransformOptions,
    out: String,
    map: SourcemapBuilder,
    lines: LineIndex,
}

impl<'a> Printer<'a> {
    fn write(&mut self, text: &str) {
        self.map.advance(text);
        self.out.push_str(text);
    }

    /// Record a mapping from the current output position back to `offset`.
    fn mark(&mut self, offset: usize) {
        let (line, col) = self.lines.position(self.source, offset);
        self.map.add_mapping(line, col);
    }

    fn mark_span(&mut self, span: Span) {
        if !span.is_empty() {
            self.mark(span.start);
        }
    }

    // -----------------------------------------------------------------
    // module shape

    fn print_module(&mut self) -> PrintJsResult<()> {
        self.print_internal_imports();

        if !self.ctx.frontmatter_module.is_empty() {
            if let Some(offset) = self.ctx.frontmatter_module_offset {
                self.mark(offset);
            }
            let segment = self.ctx.frontmatter_module.clone();
            self.write(&segment);
            self.write("\n");
        }
        let module_imports: Vec<String> = self
            .ctx
            .metadata
            .modules
            .iter()
            .enumerate()
            .map(|(idx, module)| {
                let assertion = module
                    .assertion
                    .as_ref()
                    .map(|a| format!(" assert {}", a))
                    .unwrap_or_default();
                format!(
                    "import * as $$module{} from '{}'{};\n",
                    idx + 1,
                    module.specifier,
                    assertion
                )
            })
            .collect();
        for line in module_imports {
            self.write(&line);
        }
        self.write("\n");

        let metadata = self.metadata_object();
        self.write(&format!(
            "export const {} = {}(import.meta.url, {});\n\n",
            METADATA, CREATE_METADATA, metadata
        ));

        self.write(&format!(
            "const $$Astro = {}(import.meta.url, '{}', '{}');\nconst Astro = $$Astro;\n\n",
            CREATE_ASTRO, self.options.site, self.options.project_root
        ));

        if let Some(text) = self.ctx.get_static_paths.clone() {
            if let Some(offset) = self.ctx.get_static_paths_offset {
                self.mark(offset);
            }
            self.write(&text);
            self.write("\n\n");
        }

        self.write(&format!(
            "//@ts-ignore\nconst $$Component = {}(async ($$result, $$props, $$slots) => {{\nconst Astro = $$result.createAstro($$Astro, $$props, $$slots);\nAstro.self = $$Component;\n",
            CREATE_COMPONENT
        ));

        if !self.ctx.frontmatter_render.is_empty() {
            if let Some(offset) = self.ctx.frontmatter_render_offset {
                self.mark(offset);
            }
            let segment = self.ctx.frontmatter_render.clone();
            self.write(&segment);
            self.write("\n");
        }

        self.print_style_prelude();
        self.print_script_prelude();

        self.write(&format!("return {}`", TEMPLATE_TAG));
        self.print_body()?;
        self.write("`;\n});\nexport default $$Component;\n");
        Ok(())
    }

    fn print_internal_imports(&mut self) {
        self.write("import {\n");
        for (idx, (name, alias)) in RUNTIME_IMPORTS.iter().enumerate() {
            let sep = if idx + 1 == RUNTIME_IMPORTS.len() {
                "\n"
            } else {
                ",\n"
            };
            self.write(&format!("  {} as {}{}", name, alias, sep));
        }
        self.write(&format!("}} from \"{}\";\n", self.options.internal_url));
    }

    fn metadata_object(&self) -> String {
        let mut modules = Vec::new();
        for (idx, module) in self.ctx.metadata.modules.iter().enumerate() {
            modules.push(format!(
                "{{ module: $$module{}, specifier: '{}', assert: {} }}",
                idx + 1,
                module.specifier,
                module.assertion.as_deref().unwrap_or("{}")
            ));
        }
        let hydrated = self.ctx.metadata.hydrated_components.join(", ");
        let client_only = self
            .ctx
            .metadata
            .client_only_components
            .iter()
            .map(|c| format!("'{}'", c))
            .collect::<Vec<_>>()
            .join(", ");
        let directives = self
            .ctx
            .metadata
            .hydration_directives
            .iter()
            .map(|d| format!("'{}'", d))
            .collect::<Vec<_>>()
            .join(", ");
        let hoisted = self
            .ctx
            .metadata
            .hoisted
            .iter()
            .map(|h| match h {
                HoistedScript::Inline { value } => {
                    format!("{{ type: 'inline', value: `{}` }}", escape_template(value))
                }
                HoistedScript::Remote { src } => format!("{{ type: 'remote', src: '{}' }}", src),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{{ modules: [{}], hydratedComponents: [{}], clientOnlyComponents: [{}], hydrationDirectives: new Set([{}]), hoisted: [{}] }}",
            modules.join(", "),
            hydrated,
            client_only,
            directives,
            hoisted
        )
    }

    fn print_style_prelude(&mut self) {
        if self.ctx.styles.is_empty() {
            return;
        }
        self.write("const STYLES = [\n");
        for id in self.ctx.styles.clone() {
            let entry = self.side_channel_entry(id);
            self.write(&entry);
            self.write(",\n");
        }
        self.write("];\nfor (const STYLE of STYLES) $$result.styles.add(STYLE);\n");
    }

    fn print_script_prelude(&mut self) {
        if self.options.static_extraction || self.ctx.scripts.is_empty() {
            return;
        }
        self.write("const SCRIPTS = [\n");
        for id in self.ctx.scripts.clone() {
            let entry = self.side_channel_entry(id);
            self.write(&entry);
            self.write(",\n");
        }
        self.write("];\nfor (const SCRIPT of SCRIPTS) $$result.scripts.add(SCRIPT);\n");
    }

    /// `{props:{…},children:`…`}` record for an extracted style or script.
    fn side_channel_entry(&self, id: NodeId) -> String {
        let node = self.doc.node(id);
        let props = render_props(&node.attributes, &[]);
        let children = self.doc.text_content(id);
        if children.is_empty() {
            format!("{{props:{{{}}}}}", props)
        } else {
            format!(
                "{{props:{{{}}},children:`{}`}}",
                props,
                escape_template(&children)
            )
        }
    }

    // -----------------------------------------------------------------
    // render template body

    fn print_body(&mut self) -> PrintJsResult<()> {
        let children: Vec<NodeId> = self
            .doc
            .children(Document::ROOT)
            .filter(|id| self.doc.node(*id).kind != NodeKind::Frontmatter)
            .collect();

        // whitespace before the first element and after the last one belongs
        // to the document prologue/epilogue, not the template
        let ws: Vec<bool> = children
            .iter()
            .map(|id| {
                let n = self.doc.node(*id);
                n.kind == NodeKind::Text && n.data.trim().is_empty()
            })
            .collect();
        let first_content = children.iter().position(|id| {
            matches!(
                self.doc.node(*id).kind,
                NodeKind::Element
                    | NodeKind::Component
                    | NodeKind::CustomElement
                    | NodeKind::Expression
            )
        });
        let mut trailing = children.len();
        while trailing > 0 && ws[trailing - 1] {
            trailing -= 1;
        }

        for idx in 0..trailing {
            if ws[idx] && first_content.map(|f| idx < f).unwrap_or(false) {
                continue;
            }
            self.print_node(children[idx], false)?;
        }
        Ok(())
    }

    fn print_children(&mut self, parent: NodeId) -> PrintJsResult<()> {
        let children: Vec<NodeId> = self.doc.children(parent).collect();
        for child in children {
            self.print_node(child, false)?;
        }
        Ok(())
    }

    fn print_node(&mut self, id: NodeId, strip_slot: bool) -> PrintJsResult<()> {
        let kind = self.doc.node(id).kind;
        match kind {
            NodeKind::Document | NodeKind::Frontmatter => Ok(()),
            NodeKind::Text => {
                let span = self.doc.node(id).span;
                let text = escape_template(&self.doc.node(id).data);
                self.mark_span(span);
                self.write(&text);
                Ok(())
            }
            NodeKind::Comment => {
                let span = self.doc.node(id).span;
                let text = format!("<!--{}-->", escape_template(&self.doc.node(id).data));
                self.mark_span(span);
                self.write(&text);
                Ok(())
            }
            NodeKind::Doctype => {
                let name = if self.doc.node(id).data.is_empty() {
                    "html".to_string()
                } else {
                    self.doc.node(id).data.clone()
                };
                self.write(&format!("<!DOCTYPE {}>", name));
                Ok(())
            }
            NodeKind::Expression => self.print_expression(id),
            NodeKind::Element => self.print_element(id, strip_slot),
            NodeKind::Component | NodeKind::CustomElement => self.print_component(id),
        }
    }

    fn print_expression(&mut self, id: NodeId) -> PrintJsResult<()> {
        let children: Vec<NodeId> = self.doc.children(id).collect();
        let span = self.doc.node(id).span;
        self.mark_span(span);
        self.write("${");
        if children.is_empty() {
            self.write("(void 0)");
        } else {
            for child in children {
                let kind = self.doc.node(child).kind;
                match kind {
                    NodeKind::Text => {
                        // JavaScript context: verbatim
                        let span = self.doc.node(child).span;
                        let text = self.doc.node(child).data.clone();
                        self.mark_span(span);
                        self.write(&text);
                    }
                    NodeKind::Element | NodeKind::Component | NodeKind::CustomElement => {
                        self.write(&format!("{}`", TEMPLATE_TAG));
                        self.print_node(child, false)?;
                        self.write("`");
                    }
                    _ => self.print_node(child, false)?,
                }
            }
        }
        self.write("}");
        Ok(())
    }

    fn print_element(&mut self, id: NodeId, strip_slot: bool) -> PrintJsResult<()> {
        let (name, span, attributes) = {
            let node = self.doc.node(id);
            (node.data.clone(), node.span, node.attributes.clone())
        };
        let void = is_void_element(&name.to_ascii_lowercase());

        if name == "slot" {
            return self.print_slot_element(id);
        }

        let set_directive = find_set_directive(&attributes);

        let mut skip: Vec<&str> = vec!["set:html", "set:text", "is:raw"];
        if strip_slot {
            skip.push("slot");
        }

        self.mark_span(span);
        self.write(&format!("<{}", name));
        self.print_attributes(&attributes, &skip);
        self.write(">");

        if void {
            if self.doc.node(id).first_child.is_some() {
                return Err(PrintError::InvariantViolation {
                    message: format!("void element <{}> cannot have children", name),
                    span,
                });
            }
            if set_directive.is_none() {
                return Ok(());
            }
        }

        match set_directive {
            Some(directive) => {
                let content = directive.render();
                self.write(&content);
            }
            None => {
                if let Some(vars) = self.ctx.define_vars_scripts.get(&id).cloned() {
                    self.write(&format!("${{{}({})}}", DEFINE_SCRIPT_VARS, vars));
                }
                self.print_children(id)?;
            }
        }

        self.write(&format!("</{}>", name));
        Ok(())
    }

    fn print_slot_element(&mut self, id: NodeId) -> PrintJsResult<()> {
        let (name, span) = {
            let node = self.doc.node(id);
            (
                node.attribute("name")
                    .map(|a| a.value.clone())
                    .unwrap_or_else(|| "default".to_string()),
                node.span,
            )
        };
        self.mark_span(span);
        self.write(&format!("${{{}($$result,$$slots[\"{}\"]", RENDER_SLOT, name));
        if self.doc.node(id).first_child.is_some() {
            self.write(&format!(",{}`", TEMPLATE_TAG));
            self.print_children(id)?;
            self.write("`");
        }
        self.write(")}");
        Ok(())
    }

    fn print_attributes(&mut self, attributes: &[Attribute], skip: &[&str]) {
        for attr in attributes {
            if skip.contains(&attr.name.as_str()) {
                continue;
            }
            match attr.kind {
                AttributeKind::Empty => {
                    self.write(&format!(" {}", attr.name));
                }
                AttributeKind::Quoted => {
                    self.write(&format!(
                        " {}=\"{}\"",
                        attr.name,
                        escape_attribute_value(&attr.value)
                    ));
                }
                AttributeKind::Expression => {
                    self.mark_span(attr.value_span);
                    let value = if attr.value.trim().is_empty() {
                        "(void 0)".to_string()
                    } else {
                        attr.value.clone()
                    };
                    self.write(&format!(
                        "${{{}({}, \"{}\")}}",
                        ADD_ATTRIBUTE, value, attr.name
                    ));
                }
                AttributeKind::Shorthand => {
                    self.mark_span(attr.value_span);
                    self.write(&format!(
                        "${{{}({}, \"{}\")}}",
                        ADD_ATTRIBUTE, attr.name, attr.name
                    ));
                }
                AttributeKind::Spread => {
                    self.mark_span(attr.value_span);
                    self.write(&format!("${{{}({})}}", SPREAD_ATTRIBUTES, attr.value));
                }
                AttributeKind::TemplateLiteral => {
                    self.mark_span(attr.value_span);
                    self.write(&format!(
                        "${{{}(`{}`, \"{}\")}}",
                        ADD_ATTRIBUTE, attr.value, attr.name
                    ));
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // components and slots

    fn print_component(&mut self, id: NodeId) -> PrintJsResult<()> {
        let (name, custom_element, span) = {
            let node = self.doc.node(id);
            (
                node.data.clone(),
                node.kind == NodeKind::CustomElement,
                node.span,
            )
        };
        let info = self.ctx.components.get(&id).cloned();
        let client_only = info.as_ref().map(|i| i.client_only).unwrap_or(false);

        let value = if name == "Fragment" {
            FRAGMENT.to_string()
        } else if client_only {
            "null".to_string()
        } else if custom_element {
            format!("'{}'", name)
        } else {
            name.clone()
        };

        let props = self.component_props(self.doc.node(id), &value, info.as_ref());
        let slots = self.component_slots(id);

        self.mark_span(span);
        self.write(&format!(
            "${{{}($$result,'{}',{},{{{}}}",
            RENDER_COMPONENT, name, value, props
        ));
        if let Some(groups) = slots {
            self.write(",{");
            for (key, children) in groups {
                self.write(&format!("{}: () => {}`", key, TEMPLATE_TAG));
                match children {
                    SlotContent::Nodes(ids) => {
                        for child in ids {
                            let strip = self.doc.node(child).kind == NodeKind::Element
                                && !custom_element;
                            self.print_node(child, strip)?;
                        }
                    }
                    SlotContent::Raw(text) => self.write(&text),
                }
                self.write("`,");
            }
            self.write("}");
        }
        self.write(")}");
        Ok(())
    }

    fn component_props(
        &self,
        node: &astro_parser::Node,
        value: &str,
        info: Option<&ComponentInfo>,
    ) -> String {
        let mut props: Vec<String> = Vec::new();
        let source_props = render_props(&node.attributes, &["set:html", "set:text", "is:raw"]);
        if !source_props.is_empty() {
            props.push(source_props);
        }

        if let Some(info) = info {
            if let Some(directive) = &info.directive {
                props.push(format!("\"client:component-hydration\":\"{}\"", directive));
                if info.client_only {
                    if let Some(spec) = &info.specifier {
                        props.push(format!(
                            "\"client:component-path\":({}.resolvePath(\"{}\"))",
                            METADATA, spec
                        ));
                        props.push(format!(
                            "\"client:component-export\":\"{}\"",
                            info.export_name.as_deref().unwrap_or("default")
                        ));
                    }
                } else {
                    props.push(format!(
                        "\"client:component-path\":({}.getPath({}))",
                        METADATA, value
                    ));
                    props.push(format!(
                        "\"client:component-export\":({}.getExport({}))",
                        METADATA, value
                    ));
                }
            }
        }
        props.join(",")
    }

    /// Group component children into slots. `None` means no slots argument
    /// is emitted at all.
    fn component_slots(&self, id: NodeId) -> Option<Vec<(String, SlotContent)>> {
        let node = self.doc.node(id);
        let custom_element = node.kind == NodeKind::CustomElement;

        if let Some(directive) = find_set_directive(&node.attributes) {
            return Some(vec![(
                "\"default\"".to_string(),
                SlotContent::Raw(directive.render()),
            )]);
        }

        let mut groups: Vec<(String, Vec<NodeId>)> = Vec::new();
        for child in self.doc.children(id) {
            let child_node = self.doc.node(child);
            match child_node.kind {
                NodeKind::Comment => continue,
                NodeKind::Text if child_node.data.trim().is_empty() => continue,
                _ => {}
            }
            let key = if custom_element {
                "\"default\"".to_string()
            } else {
                slot_key(child_node)
            };
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, ids)) => ids.push(child),
                None => groups.push((key, vec![child])),
            }
        }
        if groups.is_empty() {
            return None;
        }
        Some(
            groups
                .into_iter()
                .map(|(k, ids)| (k, SlotContent::Nodes(ids)))
                .collect(),
        )
    }
}

enum SlotContent {
    Nodes(Vec<NodeId>),
    Raw(String),
}

/// Rendered slot-object key for a component child.
fn slot_key(node: &astro_parser::Node) -> String {
    match node.attribute("slot") {
        Some(attr) => match attr.kind {
            AttributeKind::Quoted => format!("\"{}\"", attr.value),
            AttributeKind::Expression | AttributeKind::Shorthand => {
                format!("[{}]", attr.value)
            }
            _ => "\"default\"".to_string(),
        },
        None => "\"default\"".to_string(),
    }
}

/// `set:html` / `set:text`; when both are present the first in attribute
/// order wins.
#[derive(Debug, Clone, PartialEq)]
enum SetDirective {
    Html(String),
    Text(String),
}

impl SetDirective {
    fn render(&self) -> String {
        match self {
            SetDirective::Html(expr) => format!("${{{}({})}}", UNESCAPE_HTML, expr),
            SetDirective::Text(expr) => format!("${{{}}}", expr),
        }
    }
}

fn find_set_directive(attributes: &[Attribute]) -> Option<SetDirective> {
    for attr in attributes {
        let expr = match attr.kind {
            AttributeKind::Expression => attr.value.clone(),
            AttributeKind::Quoted => format!("\"{}\"", escape_js_string(&attr.value)),
            _ => continue,
        };
        match attr.name.as_str() {
            "set:html" => return Some(SetDirective::Html(expr)),
            "set:text" => return Some(SetDirective::Text(expr)),
            _ => {}
        }
    }
    None
}

/// Render an attribute list in prop-object form, used both for component
/// props and for extracted style/script records.
fn render_props(attributes: &[Attribute], skip: &[&str]) -> String {
    let mut props: Vec<String> = Vec::new();
    for attr in attributes {
        if skip.contains(&attr.name.as_str()) {
            continue;
        }
        match attr.kind {
            AttributeKind::Empty => props.push(format!("\"{}\":true", attr.name)),
            AttributeKind::Quoted => props.push(format!(
                "\"{}\":\"{}\"",
                attr.name,
                escape_js_string(&attr.value)
            )),
            AttributeKind::Expression => {
                let value = if attr.value.trim().is_empty() {
                    "(void 0)".to_string()
                } else {
                    format!("({})", attr.value)
                };
                props.push(format!("\"{}\":{}", attr.name, value));
            }
            AttributeKind::Shorthand => props.push(format!("\"{}\":({})", attr.name, attr.name)),
            AttributeKind::Spread => props.push(format!("...({})", attr.value)),
            AttributeKind::TemplateLiteral => {
                props.push(format!("\"{}\":`{}`", attr.name, attr.value))
            }
        }
    }
    props.join(",")
}

/// Escape text for emission inside the render template literal.
fn escape_template(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

/// Quoted HTML attribute values additionally re-escape double quotes.
fn escape_attribute_value(text: &str) -> String {
    escape_template(text).replace('"', "&quot;")
}

/// Escape text for emission inside a double-quoted JS string.
fn escape_js_string(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_template() {
        assert_eq!(escape_template("`npm install`"), "\\`npm install\\`");
        assert_eq!(escape_template("a ${b} c"), "a \\${b} c");
        assert_eq!(escape_template("C:\\x"), "C:\\\\x");
    }

    #[test]
    fn test_escape_attribute_value() {
        assert_eq!(
            escape_attribute_value("A person saying \"hello\""),
            "A person saying &quot;hello&quot;"
        );
    }

    #[test]
    fn test_set_directive_order() {
        let attrs = vec![
            Attribute::new("set:html", "content", AttributeKind::Expression),
            Attribute::new("set:text", "other", AttributeKind::Expression),
        ];
        assert_eq!(
            find_set_directive(&attrs),
            Some(SetDirective::Html("content".to_string()))
        );
    }
}
