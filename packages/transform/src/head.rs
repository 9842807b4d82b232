//! Head injection: plant the render-head sentinel.

use astro_parser::{Document, NodeId, NodeKind, Span};

/// Sentinel the runtime replaces with rendered head content.
pub const RENDER_HEAD_MARKER: &str = "<!--astro:head-->";

/// Insert the sentinel after the last child of `<head>`. When the document
/// has no `<head>` but begins with `<html>`, a head is created to hold it;
/// with neither, nothing is injected.
pub fn inject_head(doc: &mut Document) {
    if let Some(head) = doc.find(Document::ROOT, |n| n.is_element_named("head")) {
        let at = doc.node(head).span.end;
        let marker = doc.create(NodeKind::Text, RENDER_HEAD_MARKER, Span::empty(at));
        doc.append_child(head, marker);
        return;
    }

    if let Some(html) = leading_html_element(doc) {
        let at = doc.node(html).span.end;
        let head = doc.create(NodeKind::Element, "head", Span::empty(at));
        let marker = doc.create(NodeKind::Text, RENDER_HEAD_MARKER, Span::empty(at));
        doc.append_child(head, marker);
        match doc.node(html).first_child {
            Some(first) => doc.insert_before(html, first, head),
            None => doc.append_child(html, head),
        }
    }
}

/// The document's first element, provided it is `<html>` and only prologue
/// nodes (frontmatter, doctype, comments, whitespace) precede it.
fn leading_html_element(doc: &Document) -> Option<NodeId> {
    for child in doc.children(Document::ROOT) {
        let node = doc.node(child);
        match node.kind {
            NodeKind::Frontmatter | NodeKind::Doctype | NodeKind::Comment => continue,
            NodeKind::Text if node.data.trim().is_empty() => continue,
            NodeKind::Element if node.data == "html" => return Some(child),
            _ => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use astro_parser::parse;

    #[test]
    fn test_marker_after_last_head_child() {
        let mut doc = parse("<html><head><title>Ah</title></head></html>").unwrap();
        inject_head(&mut doc);
        let head = doc.find(Document::ROOT, |n| n.is_element_named("head")).unwrap();
        let last = doc.node(head).last_child.unwrap();
        assert_eq!(doc.node(last).kind, NodeKind::Text);
        assert_eq!(doc.node(last).data, RENDER_HEAD_MARKER);
        // the title is still first
        let first = doc.node(head).first_child.unwrap();
        assert_eq!(doc.node(first).data, "title");
    }

    #[test]
    fn test_head_created_inside_html() {
        let mut doc = parse("<html><body></body></html>").unwrap();
        inject_head(&mut doc);
        let html = doc.children(Document::ROOT).next().unwrap();
        let head = doc.node(html).first_child.unwrap();
        assert_eq!(doc.node(head).data, "head");
        assert_eq!(doc.node(doc.node(head).first_child.unwrap()).data, RENDER_HEAD_MARKER);
    }

    #[test]
    fn test_no_injection_without_html() {
        let mut doc = parse("<button>Click</button>").unwrap();
        let before = doc.len();
        inject_head(&mut doc);
        assert_eq!(doc.len(), before);
    }

    #[test]
    fn test_doctype_does_not_block_detection() {
        let mut doc = parse("<!DOCTYPE html><html></html>").unwrap();
        inject_head(&mut doc);
        assert!(doc.find(Document::ROOT, |n| n.is_element_named("head")).is_some());
    }
}
