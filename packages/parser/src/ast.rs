use crate::error::ParseAnomaly;
use serde::{Deserialize, Serialize};

/// Span information for source location tracking (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Handle into a `Document`'s node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Node kinds produced by the tree builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Tree root
    Document,
    /// HTML-like tag, lowercase name
    Element,
    /// Tag starting with an uppercase letter, containing `.`, or the `<>` shorthand
    Component,
    /// Tag containing `-`
    CustomElement,
    /// Raw text
    Text,
    /// HTML comment
    Comment,
    /// Doctype declaration
    Doctype,
    /// The block between the two `---` fences
    Frontmatter,
    /// A brace-delimited embedded expression
    Expression,
}

/// Attribute value syntaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// `key`
    Empty,
    /// `key="value"`, `key='value'`, or `key=value`
    Quoted,
    /// `key={expr}`
    Expression,
    /// `{name}`
    Shorthand,
    /// `{...expr}`
    Spread,
    /// ``key=`value` ``
    TemplateLiteral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub kind: AttributeKind,
    pub name_span: Span,
    pub value_span: Span,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
            name_span: Span::empty(0),
            value_span: Span::empty(0),
        }
    }
}

/// A node in the document tree.
///
/// `data` holds the element name for Element/Component/CustomElement, the text
/// for Text, the body for Comment, the name for Doctype, and the fenced source
/// for Frontmatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub data: String,
    pub attributes: Vec<Attribute>,
    pub span: Span,
    /// Derived from the tag name by the tree builder
    pub component: bool,
    /// Set by the style-scoping pass
    pub scoped: bool,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, data: String, span: Span) -> Self {
        Self {
            kind,
            data,
            attributes: Vec::new(),
            span,
            component: false,
            scoped: false,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn is_element_named(&self, name: &str) -> bool {
        self.kind == NodeKind::Element && self.data == name
    }
}

/// Elements that never take children; the self-closing slash is accepted and
/// discarded.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text (no tags, no expressions).
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Raw-text elements that still recognize `{` expressions.
pub const RCDATA_ELEMENTS: &[&str] = &["title", "textarea"];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

pub fn is_rcdata_element(name: &str) -> bool {
    RCDATA_ELEMENTS.contains(&name)
}

/// True for names that denote a component invocation: leading uppercase,
/// namespaced (`ns.Component`), or the fragment shorthand / literal.
pub fn is_component_name(name: &str) -> bool {
    name.is_empty()
        || name.contains('.')
        || name
            .chars()
            .next()
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
}

pub fn is_custom_element_name(name: &str) -> bool {
    name.contains('-')
}

/// Ordered rooted tree of nodes, stored as an arena.
///
/// Node 0 is always the Document root. Nodes are created only by the tree
/// builder; transforms may re-link subtrees but nothing is freed until the
/// whole tree is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    nodes: Vec<Node>,
    /// Recoverable parse anomalies, in source order
    pub anomalies: Vec<ParseAnomaly>,
}

impl Document {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document, String::new(), Span::empty(0))],
            anomalies: Vec::new(),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Allocate a new detached node.
    pub fn create(&mut self, kind: NodeKind, data: impl Into<String>, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut node = Node::new(kind, data.into(), span);
        node.component = kind == NodeKind::Component;
        self.nodes.push(node);
        id
    }

    /// Append `child` as the last child of `parent`. The child must be detached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child.0].parent.is_none());
        let prev = self.nodes[parent.0].last_child;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].prev_sibling = prev;
        self.nodes[child.0].next_sibling = None;
        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Insert `child` before `reference` under the same parent.
    pub fn insert_before(&mut self, parent: NodeId, reference: NodeId, child: NodeId) {
        debug_assert_eq!(self.nodes[reference.0].parent, Some(parent));
        let prev = self.nodes[reference.0].prev_sibling;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].prev_sibling = prev;
        self.nodes[child.0].next_sibling = Some(reference);
        self.nodes[reference.0].prev_sibling = Some(child);
        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
    }

    /// Unlink a node from its parent and siblings. The node (and its subtree)
    /// stays alive in the arena and can be re-attached or read later.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let n = &self.nodes[id.0];
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        if let Some(parent) = parent {
            if self.nodes[parent.0].first_child == Some(id) {
                self.nodes[parent.0].first_child = next;
            }
            if self.nodes[parent.0].last_child == Some(id) {
                self.nodes[parent.0].last_child = prev;
            }
        }
        if let Some(prev) = prev {
            self.nodes[prev.0].next_sibling = next;
        }
        if let Some(next) = next {
            self.nodes[next.0].prev_sibling = prev;
        }
        let n = &mut self.nodes[id.0];
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.nodes[id.0].first_child,
        }
    }

    /// Pre-order traversal of the subtree rooted at `id`, including `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    /// First pre-order descendant matching the predicate.
    pub fn find(&self, from: NodeId, pred: impl Fn(&Node) -> bool) -> Option<NodeId> {
        self.descendants(from).find(|id| pred(self.node(*id)))
    }

    /// Concatenated text of all Text children (raw-text element contents).
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            let node = self.node(child);
            if node.kind == NodeKind::Text {
                out.push_str(&node.data);
            }
        }
        out
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.doc.node(id).next_sibling;
        Some(id)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let mut children: Vec<NodeId> = self.doc.children(id).collect();
        children.reverse();
        self.stack.extend(children);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_iterate() {
        let mut doc = Document::new();
        let a = doc.create(NodeKind::Element, "div", Span::empty(0));
        let b = doc.create(NodeKind::Text, "hi", Span::empty(0));
        doc.append_child(Document::ROOT, a);
        doc.append_child(a, b);

        let children: Vec<NodeId> = doc.children(Document::ROOT).collect();
        assert_eq!(children, vec![a]);
        assert_eq!(doc.node(b).parent, Some(a));
        assert_eq!(doc.node(a).first_child, Some(b));
        assert_eq!(doc.node(a).last_child, Some(b));
    }

    #[test]
    fn test_sibling_links() {
        let mut doc = Document::new();
        let a = doc.create(NodeKind::Element, "a", Span::empty(0));
        let b = doc.create(NodeKind::Element, "b", Span::empty(0));
        let c = doc.create(NodeKind::Element, "c", Span::empty(0));
        doc.append_child(Document::ROOT, a);
        doc.append_child(Document::ROOT, b);
        doc.append_child(Document::ROOT, c);

        assert_eq!(doc.node(b).prev_sibling, Some(a));
        assert_eq!(doc.node(b).next_sibling, Some(c));

        doc.detach(b);
        assert_eq!(doc.node(a).next_sibling, Some(c));
        assert_eq!(doc.node(c).prev_sibling, Some(a));
        let children: Vec<NodeId> = doc.children(Document::ROOT).collect();
        assert_eq!(children, vec![a, c]);
    }

    #[test]
    fn test_insert_before() {
        let mut doc = Document::new();
        let a = doc.create(NodeKind::Element, "a", Span::empty(0));
        let c = doc.create(NodeKind::Element, "c", Span::empty(0));
        doc.append_child(Document::ROOT, a);
        doc.append_child(Document::ROOT, c);
        let b = doc.create(NodeKind::Element, "b", Span::empty(0));
        doc.insert_before(Document::ROOT, c, b);

        let names: Vec<String> = doc
            .children(Document::ROOT)
            .map(|id| doc.node(id).data.clone())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut doc = Document::new();
        let div = doc.create(NodeKind::Element, "div", Span::empty(0));
        let span = doc.create(NodeKind::Element, "span", Span::empty(0));
        let text = doc.create(NodeKind::Text, "x", Span::empty(0));
        let p = doc.create(NodeKind::Element, "p", Span::empty(0));
        doc.append_child(Document::ROOT, div);
        doc.append_child(div, span);
        doc.append_child(span, text);
        doc.append_child(div, p);

        let order: Vec<NodeId> = doc.descendants(Document::ROOT).collect();
        assert_eq!(order, vec![Document::ROOT, div, span, text, p]);
    }

    #[test]
    fn test_component_names() {
        assert!(is_component_name("Button"));
        assert!(is_component_name("ns.Component"));
        assert!(is_component_name(""));
        assert!(!is_component_name("div"));
        assert!(is_custom_element_name("my-element"));
        assert!(!is_custom_element_name("div"));
    }
}
