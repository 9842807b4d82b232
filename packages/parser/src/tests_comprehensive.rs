//! End-to-end parsing tests over realistic documents.

use crate::ast::{Document, NodeKind};
use crate::parser::parse;
use crate::tokenizer::tokenize;

fn roundtrip(source: &str) {
    let tokens = tokenize(source).unwrap();
    let rebuilt: String = tokens
        .iter()
        .map(|t| {
            let span = t.span();
            &source[span.start..span.end]
        })
        .collect();
    assert_eq!(rebuilt, source);
}

#[test]
fn test_full_page_document() {
    let source = r#"---
import Layout from '../layouts/Layout.astro';
const title = 'Home';
---
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
      .hero { padding: 2rem; }
    </style>
  </head>
  <body>
    <Layout>
      <h1 class="hero">Welcome</h1>
      {items.map(item => <li>{item.name}</li>)}
    </Layout>
  </body>
</html>
"#;
    roundtrip(source);
    let doc = parse(source).unwrap();
    assert!(doc.anomalies.is_empty());

    let fm = doc
        .find(Document::ROOT, |n| n.kind == NodeKind::Frontmatter)
        .unwrap();
    assert!(doc.node(fm).data.contains("import Layout"));

    let layout = doc
        .find(Document::ROOT, |n| n.kind == NodeKind::Component)
        .unwrap();
    assert_eq!(doc.node(layout).data, "Layout");

    let style = doc
        .find(Document::ROOT, |n| n.is_element_named("style"))
        .unwrap();
    assert!(doc.text_content(style).contains(".hero"));
}

#[test]
fn test_nested_expressions_article() {
    let source = r#"<article>{(previous || next) && <aside>{previous && <div>Previous: <a rel="prev" href={previous.link}>{previous.text}</a></div>}</aside>}</article>"#;
    roundtrip(source);
    let doc = parse(source).unwrap();
    assert!(doc.anomalies.is_empty());

    let article = doc.children(Document::ROOT).next().unwrap();
    let outer = doc.children(article).next().unwrap();
    assert_eq!(doc.node(outer).kind, NodeKind::Expression);

    let aside = doc
        .find(outer, |n| n.is_element_named("aside"))
        .unwrap();
    let inner = doc
        .find(aside, |n| n.kind == NodeKind::Expression)
        .unwrap();
    assert!(doc
        .find(inner, |n| n.is_element_named("a"))
        .is_some());
}

#[test]
fn test_html5_boilerplate() {
    let source = r#"<!doctype html>

<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>A Basic HTML5 Template</title>
  <link rel="icon" href="/favicon.ico">
</head>

<body>
  <!-- your content here... -->
  <script is:inline src="js/scripts.js"></script>
  </body>
</html>"#;
    roundtrip(source);
    let doc = parse(source).unwrap();
    assert!(doc.anomalies.is_empty());
    let doctype = doc
        .find(Document::ROOT, |n| n.kind == NodeKind::Doctype)
        .unwrap();
    assert_eq!(doc.node(doctype).data, "html");
}

#[test]
fn test_sibling_components_stay_siblings() {
    let doc = parse("<BaseHead /><link href=\"test\">").unwrap();
    let kinds: Vec<NodeKind> = doc
        .children(Document::ROOT)
        .map(|c| doc.node(c).kind)
        .collect();
    assert_eq!(kinds, vec![NodeKind::Component, NodeKind::Element]);
}

#[test]
fn test_empty_frontmatter() {
    let doc = parse("---\n---\n<script type=\"module\" hoist src=\"url\" />").unwrap();
    let fm = doc.children(Document::ROOT).next().unwrap();
    assert_eq!(doc.node(fm).kind, NodeKind::Frontmatter);
    assert_eq!(doc.node(fm).data, "\n");
}

#[test]
fn test_select_with_nested_option_expression() {
    let source = "<select>{value && <option>{value}</option>}</select>";
    roundtrip(source);
    let doc = parse(source).unwrap();
    assert!(doc
        .find(Document::ROOT, |n| n.is_element_named("option"))
        .is_some());
}

#[test]
fn test_svg_with_style_and_expression() {
    let source = "<svg><style>path { fill: red; }</style>{title ?? null}</svg>";
    roundtrip(source);
    let doc = parse(source).unwrap();
    let svg = doc.children(Document::ROOT).next().unwrap();
    let kinds: Vec<NodeKind> = doc.children(svg).map(|c| doc.node(c).kind).collect();
    assert_eq!(kinds, vec![NodeKind::Element, NodeKind::Expression]);
}

#[test]
fn test_expression_with_js_object_literal() {
    let source = "<Component data={{ a: 1, b: { c: 2 } }} />";
    roundtrip(source);
    let doc = parse(source).unwrap();
    let comp = doc.children(Document::ROOT).next().unwrap();
    let attr = doc.node(comp).attribute("data").unwrap();
    assert_eq!(attr.value, "{ a: 1, b: { c: 2 } }");
}

#[test]
fn test_whitespace_only_document() {
    let doc = parse("   \n\t  ").unwrap();
    let kinds: Vec<NodeKind> = doc
        .children(Document::ROOT)
        .map(|c| doc.node(c).kind)
        .collect();
    assert_eq!(kinds, vec![NodeKind::Text]);
}

#[test]
fn test_fatal_error_has_no_partial_output() {
    let err = parse("<div>{unbalanced").unwrap_err();
    assert_eq!(err.position(), 5);
}
