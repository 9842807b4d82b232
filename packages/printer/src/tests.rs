//! Printer tests over full parse → transform → print runs.

use crate::printer::print_to_js;
use astro_parser::parse;
use astro_transform::{transform, TransformContext, TransformOptions};

const INTERNAL_URL: &str = "http://localhost:3000/";

fn options(scope: Option<&str>) -> TransformOptions {
    TransformOptions {
        scope: scope.map(String::from),
        site: "https://astro.build".to_string(),
        internal_url: INTERNAL_URL.to_string(),
        project_root: ".".to_string(),
        static_extraction: false,
    }
}

fn build_with(source: &str, options: &TransformOptions) -> (String, String, TransformContext) {
    let mut doc = parse(source).unwrap();
    let ctx = transform(&mut doc, source, options);
    let result = print_to_js(source, &doc, &ctx, options).unwrap();
    (result.output, result.source_map_chunk, ctx)
}

fn build(source: &str) -> String {
    build_with(source, &options(None)).0
}

fn build_scoped(source: &str, scope: &str) -> String {
    build_with(source, &options(Some(scope))).0
}

#[test]
fn test_basic_no_frontmatter() {
    let output = build("<button>Click</button>");
    assert!(output.contains("return $$render`<button>Click</button>`;"));
}

#[test]
fn test_internal_import_aliases() {
    let output = build("<div />");
    assert!(output.contains("Fragment as $$Fragment"));
    assert!(output.contains("render as $$render"));
    assert!(output.contains("createMetadata as $$createMetadata"));
    assert!(output.contains(&format!("}} from \"{}\";", INTERNAL_URL)));
}

#[test]
fn test_basic_render_head() {
    let output = build("<html><head><title>Ah</title></head></html>");
    assert!(output.contains("<title>Ah</title><!--astro:head--></head>"));
}

#[test]
fn test_head_created_for_bare_html() {
    let output = build("<html><body></body></html>");
    assert!(output.contains("<html><head><!--astro:head--></head><body></body></html>"));
}

#[test]
fn test_frontmatter_attribute_expression() {
    let output = build("---\nconst href = '/about';\n---\n<a href={href}>About</a>");
    assert!(output.contains("const href = '/about';"));
    assert!(output.contains("<a${$$addAttribute(href, \"href\")}>About</a>"));
}

#[test]
fn test_component_body_shape() {
    let output = build("<div />");
    assert!(output.contains(
        "const $$Component = $$createComponent(async ($$result, $$props, $$slots) => {"
    ));
    assert!(output.contains("const Astro = $$result.createAstro($$Astro, $$props, $$slots);"));
    assert!(output.contains("Astro.self = $$Component;"));
    assert!(output.ends_with("export default $$Component;\n"));
}

#[test]
fn test_exactly_one_create_astro_and_default_export() {
    let output = build("---\nconst a = 1;\n---\n<div>{a}</div>");
    assert_eq!(output.matches("$$createAstro(").count(), 1);
    assert_eq!(output.matches("export default").count(), 1);
    assert!(output.contains(
        "const $$Astro = $$createAstro(import.meta.url, 'https://astro.build', '.');"
    ));
}

#[test]
fn test_style_extraction_and_scoping() {
    let (output, _, ctx) = build_with(
        "<style>.x{color:red}</style><div class=\"x\">hi</div>",
        &options(Some("ABCDEFGH")),
    );
    assert!(output.contains("const STYLES = ["));
    assert!(output.contains("{props:{\"data-astro-id\":\"ABCDEFGH\"},children:`.x.astro-ABCDEFGH{color:red}`}"));
    assert!(output.contains("for (const STYLE of STYLES) $$result.styles.add(STYLE);"));
    assert!(output.contains("<div class=\"x\" data-astro-scope=\"ABCDEFGH\">hi</div>"));
    assert_eq!(ctx.styles.len(), 1);
}

#[test]
fn test_client_only_component() {
    let source = "---\nimport Component from '../components';\n---\n<html>\n  <head>\n    <title>Hello world</title>\n  </head>\n  <body>\n    <Component client:only />\n  </body>\n</html>";
    let (output, _, ctx) = build_with(source, &options(None));
    assert_eq!(ctx.metadata.client_only_components, vec!["../components"]);
    assert_eq!(ctx.metadata.hydration_directives, vec!["only"]);
    // the import is skipped so the bundler can drop it
    assert!(!output.contains("$$module1"));
    assert!(output.contains(
        "${$$renderComponent($$result,'Component',null,{\"client:only\":true,\"client:component-hydration\":\"only\",\"client:component-path\":($$metadata.resolvePath(\"../components\")),\"client:component-export\":\"default\"})}"
    ));
}

#[test]
fn test_client_only_named_export() {
    let source = "---\nimport { Component } from '../components';\n---\n<Component client:only />";
    let (output, _, _) = build_with(source, &options(None));
    assert!(output.contains("\"client:component-export\":\"Component\""));
}

#[test]
fn test_hydrated_component_props() {
    let source = "---\nimport Counter from '../components/Counter.jsx'\nconst someProps = {\n  count: 0,\n}\n---\n<Counter {...someProps} client:visible>\n  <h1>Hello React!</h1>\n</Counter>";
    let (output, _, ctx) = build_with(source, &options(None));
    assert_eq!(ctx.metadata.hydrated_components, vec!["Counter"]);
    assert_eq!(ctx.metadata.hydration_directives, vec!["visible"]);
    assert!(output.contains("import * as $$module1 from '../components/Counter.jsx';"));
    assert!(output.contains(
        "...(someProps),\"client:visible\":true,\"client:component-hydration\":\"visible\",\"client:component-path\":($$metadata.getPath(Counter)),\"client:component-export\":($$metadata.getExport(Counter))"
    ));
    assert!(output.contains("{\"default\": () => $$render`<h1>Hello React!</h1>`,}"));
}

#[test]
fn test_hydrated_custom_element() {
    let source = "---\nimport 'custom-element';\n---\n<my-element client:load />";
    let (output, _, ctx) = build_with(source, &options(None));
    assert_eq!(ctx.metadata.hydrated_components, vec!["'my-element'"]);
    assert!(output.contains(
        "${$$renderComponent($$result,'my-element','my-element',{\"client:load\":true,\"client:component-hydration\":\"load\",\"client:component-path\":($$metadata.getPath('my-element')),\"client:component-export\":($$metadata.getExport('my-element'))})}"
    ));
}

#[test]
fn test_set_html() {
    let output = build("<article set:html={content}>drop me</article>");
    assert!(output.contains("<article>${$$unescapeHTML(content)}</article>"));
    assert!(!output.contains("drop me"));
}

#[test]
fn test_set_text() {
    let output = build("<article set:text={content} />");
    assert!(output.contains("<article>${content}</article>"));
}

#[test]
fn test_set_html_and_set_text_first_wins() {
    let output = build("<article set:html={content} set:text={content} />");
    assert!(output.contains("<article>${$$unescapeHTML(content)}</article>"));
}

#[test]
fn test_set_html_on_component_becomes_default_slot() {
    let output = build("<Component set:html={content} />");
    assert!(output.contains(
        "${$$renderComponent($$result,'Component',Component,{},{\"default\": () => $$render`${$$unescapeHTML(content)}`,})}"
    ));
}

#[test]
fn test_set_html_on_script_keeps_element() {
    let output = build("<script set:html={content} />");
    assert!(output.contains("<script>${$$unescapeHTML(content)}</script>"));
}

#[test]
fn test_conditional_render() {
    let output = build("<body>{false ? <div>#f</div> : <div>#t</div>}</body>");
    assert!(output.contains(
        "<body>${false ? $$render`<div>#f</div>` : $$render`<div>#t</div>`}</body>"
    ));
}

#[test]
fn test_map_with_attribute_expression() {
    let output = build(
        "<header><nav>{menu.map((item) => <a href={item.href}>{item.title}</a>)}</nav></header>",
    );
    assert!(output.contains(
        "<header><nav>${menu.map((item) => $$render`<a${$$addAttribute(item.href, \"href\")}>${item.title}</a>`)}</nav></header>"
    ));
}

#[test]
fn test_table_expressions_no_tbody() {
    let output = build("---\nconst items = [\"Dog\"];\n---\n<table>{items.map(item => (<tr><td>{item}</td></tr>))}</table>");
    assert!(output.contains(
        "<table>${items.map(item => ($$render`<tr><td>${item}</td></tr>`))}</table>"
    ));
    assert!(!output.contains("tbody"));
}

#[test]
fn test_backtick_in_comment_escaped() {
    let output = build("<body><!-- `npm install astro` --></body>");
    assert!(output.contains("<body><!-- \\`npm install astro\\` --></body>"));
}

#[test]
fn test_nested_template_literal_attribute() {
    let output = build("<div value={`${attr ? `a/b` : \"c\"} awesome`} />");
    assert!(output.contains(
        "<div${$$addAttribute(`${attr ? `a/b` : \"c\"} awesome`, \"value\")}></div>"
    ));
}

#[test]
fn test_expression_with_js_comments() {
    let output =
        build("<div>{items.map((item) => (\n// foo < > < }\n<div id={color}>color</div>\n))}</div>");
    assert!(output.contains("// foo < > < }"));
    assert!(output.contains("$$render`<div${$$addAttribute(color, \"id\")}>color</div>`"));
}

#[test]
fn test_slots_basic() {
    let source = "---\nimport Component from \"test\";\n---\n<Component>\n\t<div>Default</div>\n\t<div slot=\"named\">Named</div>\n</Component>";
    let output = build(source);
    assert!(output.contains(
        "${$$renderComponent($$result,'Component',Component,{},{\"default\": () => $$render`<div>Default</div>`,\"named\": () => $$render`<div>Named</div>`,})}"
    ));
}

#[test]
fn test_slots_skip_comments() {
    let source = "---\nimport Component from 'test';\n---\n<Component>\n\t<div>Default</div>\n\t<!-- A comment! -->\n\t<div slot=\"named\">Named</div>\n</Component>";
    let output = build(source);
    assert!(!output.contains("A comment!"));
    assert!(output.contains("\"named\": () => $$render`<div>Named</div>`,"));
}

#[test]
fn test_dynamic_slot_name() {
    let source = "---\nimport Component from 'test';\nconst name = 'named';\n---\n<Component>\n\t<div slot={name}>Named</div>\n</Component>";
    let output = build(source);
    assert!(output.contains("{[name]: () => $$render`<div>Named</div>`,}"));
}

#[test]
fn test_custom_element_preserves_slot_attributes() {
    let output =
        build("<body><my-element><div slot=name>Name</div><div>Default</div></my-element></body>");
    assert!(output.contains(
        "${$$renderComponent($$result,'my-element','my-element',{},{\"default\": () => $$render`<div slot=\"name\">Name</div><div>Default</div>`,})}"
    ));
}

#[test]
fn test_fragment_shorthand() {
    let output = build("<body><><div>Default</div><div>Named</div></></body>");
    assert!(output.contains(
        "${$$renderComponent($$result,'Fragment',$$Fragment,{},{\"default\": () => $$render`<div>Default</div><div>Named</div>`,})}"
    ));
}

#[test]
fn test_fragment_literal() {
    let output = build("<Fragment>world</Fragment>");
    assert!(output.contains(
        "${$$renderComponent($$result,'Fragment',$$Fragment,{},{\"default\": () => $$render`world`,})}"
    ));
}

#[test]
fn test_head_slot() {
    let output = build("<html><head><slot /></html>");
    assert!(output.contains(
        "<html><head>${$$renderSlot($$result,$$slots[\"default\"])}<!--astro:head--></head></html>"
    ));
}

#[test]
fn test_slot_with_fallback() {
    let output = build("<slot name=\"body\"><p>fallback</p></slot>");
    assert!(output.contains(
        "${$$renderSlot($$result,$$slots[\"body\"],$$render`<p>fallback</p>`)}"
    ));
}

#[test]
fn test_script_hoist_inline() {
    let source = "---\n---\n<script type=\"module\" hoist>console.log(\"Hello\");</script>";
    let (output, _, ctx) = build_with(source, &options(None));
    assert!(output.contains("const SCRIPTS = ["));
    assert!(output.contains(
        "{props:{\"type\":\"module\",\"hoist\":true},children:`console.log(\"Hello\");`}"
    ));
    assert!(output.contains("for (const SCRIPT of SCRIPTS) $$result.scripts.add(SCRIPT);"));
    assert!(output.contains("hoisted: [{ type: 'inline', value: `console.log(\"Hello\");` }]"));
    assert!(output.contains("return $$render``;"));
    assert_eq!(ctx.scripts.len(), 1);
}

#[test]
fn test_script_hoist_remote() {
    let source = "---\n---\n<script type=\"module\" hoist src=\"url\" />";
    let (output, _, _) = build_with(source, &options(None));
    assert!(output.contains("{props:{\"type\":\"module\",\"hoist\":true,\"src\":\"url\"}}"));
    assert!(output.contains("hoisted: [{ type: 'remote', src: 'url' }]"));
}

#[test]
fn test_static_extraction_omits_script_prelude() {
    let source = "<script hoist>console.log(1);</script>";
    let opts = TransformOptions {
        static_extraction: true,
        ..options(None)
    };
    let (output, _, _) = build_with(source, &opts);
    assert!(!output.contains("const SCRIPTS"));
    assert!(output.contains("hoisted: [{ type: 'inline', value: `console.log(1);` }]"));
}

#[test]
fn test_script_inline() {
    let output = build("<main><script is:inline type=\"module\">console.log(\"Hello\");</script></main>");
    assert!(output.contains(
        "<main><script type=\"module\">console.log(\"Hello\");</script></main>"
    ));
}

#[test]
fn test_script_define_vars() {
    let output =
        build("<main><script define:vars={{ value: 0 }} type=\"module\">console.log(value);</script></main>");
    assert!(output.contains(
        "<main><script type=\"module\">${$$defineScriptVars({ value: 0 })}console.log(value);</script></main>"
    ));
}

#[test]
fn test_get_static_paths_hoisted_to_module_scope() {
    let source = "---\nconst a = 0;\nexport const getStaticPaths = async () => {\n\treturn { paths: [] }\n}\n---\n<div></div>";
    let output = build(source);
    let gsp_at = output.find("export const getStaticPaths").unwrap();
    let component_at = output.find("$$createComponent").unwrap();
    assert!(gsp_at < component_at);
    assert!(output.contains("const a = 0;"));
}

#[test]
fn test_import_assertion_emitted() {
    let source = "---\nimport data from \"test\" assert { type: 'json' };\n---\n";
    let output = build(source);
    assert!(output.contains("import * as $$module1 from 'test' assert { type: 'json' };"));
    assert!(output.contains(
        "{ module: $$module1, specifier: 'test', assert: { type: 'json' } }"
    ));
}

#[test]
fn test_doctype_normalized() {
    let output = build("<!doctype html><div/>");
    assert!(output.contains("<!DOCTYPE html><div></div>"));
}

#[test]
fn test_void_elements_never_closed() {
    let output = build("<meta charset=\"utf-8\"><br><img src=\"x\">");
    assert!(output.contains("<meta charset=\"utf-8\">"));
    assert!(!output.contains("</meta>"));
    assert!(!output.contains("</br>"));
    assert!(!output.contains("</img>"));
}

#[test]
fn test_self_closing_non_void_gets_end_tag() {
    let output = build("<iframe src=\"something\" />");
    assert!(output.contains("<iframe src=\"something\"></iframe>"));
}

#[test]
fn test_empty_expression() {
    let output = build("<body>({})</body>");
    assert!(output.contains("<body>(${(void 0)})</body>"));
}

#[test]
fn test_empty_attribute_expression() {
    let output = build("<body attr={}></body>");
    assert!(output.contains("<body${$$addAttribute((void 0), \"attr\")}></body>"));
}

#[test]
fn test_title_expressions() {
    let output = build("<title>a {expr} b {expr} c</title>");
    assert!(output.contains("<title>a ${expr} b ${expr} c</title>"));
}

#[test]
fn test_textarea_inside_expression() {
    let output = build("{bool && <textarea>{value}</textarea>} {!bool && <input>}");
    assert!(output.contains(
        "${bool && $$render`<textarea>${value}</textarea>`} ${!bool && $$render`<input>`}"
    ));
}

#[test]
fn test_is_raw_content_passes_through() {
    let output = build("<article is:raw><% awesome %></article>");
    assert!(output.contains("<article><% awesome %></article>"));
}

#[test]
fn test_escaped_entity_requoted() {
    let output = build("<img alt=\"A person saying &#x22;hello&#x22;\">");
    assert!(output.contains("<img alt=\"A person saying &quot;hello&quot;\">"));
}

#[test]
fn test_unquoted_attribute_becomes_quoted() {
    let output = build("{cond && <meta charset=utf8>}");
    assert!(output.contains("${cond && $$render`<meta charset=\"utf8\">`}"));
}

#[test]
fn test_svg_styles_stay_inline() {
    let output = build("<svg><style>path { fill: red; }</style></svg>");
    assert!(output.contains("<svg><style>path { fill: red; }</style></svg>"));
}

#[test]
fn test_large_document_streams() {
    let mut source = String::from("<html><body>");
    let chunk = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-_=+[];:'\",.?";
    for _ in 0..50 {
        source.push_str(chunk);
    }
    source.push_str("</body></html>");
    assert!(source.len() > 4096);
    let output = build(&source);
    assert!(output.contains(chunk));
}

#[test]
fn test_sourcemap_chunk_decodes() {
    let source = "---\nconst href = '/about';\n---\n<a href={href}>About</a>\n<div>text</div>";
    let (_, chunk, _) = build_with(source, &options(None));
    assert!(!chunk.is_empty());
    let json = format!(
        "{{\"version\":3,\"sources\":[\"file.astro\"],\"names\":[],\"mappings\":\"{}\"}}",
        chunk
    );
    let map = sourcemap::SourceMap::from_slice(json.as_bytes()).expect("decodable mappings");
    assert!(map.get_token_count() > 0);
    // mappings are monotone by output position
    let mut last = (0u32, 0u32);
    for token in map.tokens() {
        let dst = token.get_dst();
        assert!(dst >= last, "sourcemap must be monotone by output offset");
        last = dst;
    }
}

#[test]
fn test_void_element_with_children_is_a_bug() {
    let mut doc = parse("<img>").unwrap();
    // force the invariant violation the tree builder normally prevents
    let img = doc.children(astro_parser::Document::ROOT).next().unwrap();
    let text = doc.create(
        astro_parser::NodeKind::Text,
        "x",
        astro_parser::Span::empty(0),
    );
    doc.append_child(img, text);
    let ctx = TransformContext::new("XXXX".to_string());
    let err = print_to_js("<img>", &doc, &ctx, &options(None)).unwrap_err();
    assert!(matches!(err, crate::printer::PrintError::InvariantViolation { .. }));
}

#[test]
fn test_component_siblings_stay_siblings() {
    let output = build("<BaseHead /><link href=\"test\">");
    assert!(output.contains(
        "${$$renderComponent($$result,'BaseHead',BaseHead,{})}<link href=\"test\">"
    ));
}

#[test]
fn test_namespaced_component() {
    let source = "---\nimport * as ns from '../components';\n---\n<ns.Component />";
    let output = build(source);
    assert!(output.contains("${$$renderComponent($$result,'ns.Component',ns.Component,{})}"));
}

#[test]
fn test_nested_expressions() {
    let source = "<article>{(previous || next) && <aside>{previous && <div>Previous</div>}</aside>}</article>";
    let output = build(source);
    assert!(output.contains(
        "<article>${(previous || next) && $$render`<aside>${previous && $$render`<div>Previous</div>`}</aside>`}</article>"
    ));
}

#[test]
fn test_quoted_props_on_component() {
    let output = build("<Base title=\"Home\"><div>Hello</div></Base>");
    assert!(output.contains(
        "${$$renderComponent($$result,'Base',Base,{\"title\":\"Home\"},{\"default\": () => $$render`<div>Hello</div>`,})}"
    ));
}

#[test]
fn test_shorthand_prop_on_component() {
    let output = build("<Component {data}>{items.map(item => <div>{item}</div>)}</Component>");
    assert!(output.contains("{\"data\":(data)}"));
    assert!(output.contains(
        "{\"default\": () => $$render`${items.map(item => $$render`<div>${item}</div>`)}`,}"
    ));
}

#[test]
fn test_leading_whitespace_before_first_element_dropped() {
    let output = build("<!doctype html>\n\n<html lang=\"en\"></html>");
    assert!(output.contains("return $$render`<!DOCTYPE html><html lang=\"en\">"));
}
