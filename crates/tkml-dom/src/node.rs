//! Arena node tree

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use crate::ident::{sanitize_id, IdGenerator};
use crate::kind::KindSpec;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(Arc<KindSpec>),
    Text(String),
    /// Tag with no registered kind; renders a visible diagnostic
    Undefined { tag: String },
    /// Node rejected by a structural rule; renders a visible diagnostic
    Error { message: String },
}

impl NodeKind {
    pub fn tag(&self) -> &str {
        match self {
            NodeKind::Element(spec) => spec.tag(),
            NodeKind::Text(_) => "text",
            NodeKind::Undefined { .. } => "undefined",
            NodeKind::Error { .. } => "error",
        }
    }
}

#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    attributes: HashMap<String, String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    identity: OnceLock<String>,
    raw: Option<String>,
}

impl Node {
    pub fn element(spec: Arc<KindSpec>, attributes: HashMap<String, String>) -> Self {
        Self::with_kind(NodeKind::Element(spec), attributes)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Text(text.into()), HashMap::new())
    }

    pub fn undefined(tag: &str, attributes: HashMap<String, String>) -> Self {
        Self::with_kind(
            NodeKind::Undefined {
                tag: tag.to_string(),
            },
            attributes,
        )
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_kind(
            NodeKind::Error {
                message: message.into(),
            },
            HashMap::new(),
        )
    }

    fn with_kind(kind: NodeKind, attributes: HashMap<String, String>) -> Self {
        let identity = OnceLock::new();
        if let Some(id) = attributes.get("id") {
            let id = sanitize_id(id);
            if !id.is_empty() {
                let _ = identity.set(id);
            }
        }

        Self {
            kind,
            attributes,
            children: Vec::new(),
            parent: None,
            identity,
            raw: None,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn tag(&self) -> &str {
        self.kind.tag()
    }

    pub fn spec(&self) -> Option<&Arc<KindSpec>> {
        match &self.kind {
            NodeKind::Element(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Captured content of a raw-text element, set once its close tag is seen.
    pub fn raw_text(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn allows_raw_text(&self) -> bool {
        self.spec().is_some_and(|s| s.allows_raw_text())
    }

    pub fn is_self_closing(&self) -> bool {
        self.spec().is_some_and(|s| s.is_self_closing())
    }

    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Undefined { .. } | NodeKind::Error { .. }
        )
    }

    /// Identity if one was given explicitly or has already been generated.
    pub fn explicit_identity(&self) -> Option<&str> {
        self.identity.get().map(String::as_str)
    }
}

/// Snapshot of an element without its children.
///
/// Used to carry a live element (typically the parent of a lazy-load slot)
/// into a later parse, where a fresh copy adopts the parsed children.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedNode {
    pub kind: NodeKind,
    pub attributes: HashMap<String, String>,
    pub identity: String,
}

pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    ids: Arc<IdGenerator>,
}

impl Tree {
    /// Create a tree holding only the document node.
    pub fn new(root: Arc<KindSpec>, ids: Arc<IdGenerator>) -> Self {
        Self {
            nodes: vec![Node::element(root, HashMap::new())],
            root: NodeId(0),
            ids,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn ids(&self) -> &Arc<IdGenerator> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Stable identity, generated on first request when the markup gave none.
    pub fn identity(&self, id: NodeId) -> &str {
        let node = &self.nodes[id.0];
        node.identity.get_or_init(|| self.ids.next(node.tag()))
    }

    /// Append `node` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append text under `parent`, merging with a directly preceding text leaf.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.0].kind {
                existing.push_str(text);
                return last;
            }
        }
        self.append(parent, Node::text(text))
    }

    /// Replace the attributes of the document node (explicit envelope tag).
    pub fn set_root_attributes(&mut self, attributes: HashMap<String, String>) {
        let root = &mut self.nodes[self.root.0];
        if let Some(id) = attributes.get("id") {
            let id = sanitize_id(id);
            if !id.is_empty() {
                root.identity = OnceLock::new();
                let _ = root.identity.set(id);
            }
        }
        root.attributes = attributes;
    }

    /// Finalize the captured content of a raw-text element.
    pub fn set_raw(&mut self, id: NodeId, content: String) {
        self.nodes[id.0].raw = Some(content);
    }

    pub fn detach(&self, id: NodeId) -> DetachedNode {
        let node = &self.nodes[id.0];
        DetachedNode {
            kind: node.kind.clone(),
            attributes: node.attributes.clone(),
            identity: self.identity(id).to_string(),
        }
    }

    /// Move every child of `from` under a fresh copy of `template`.
    ///
    /// The copy has no parent of its own; it stands in for a live element
    /// that exists outside this tree.
    pub fn adopt_children(&mut self, from: NodeId, template: &DetachedNode) -> NodeId {
        let children = std::mem::take(&mut self.nodes[from.0].children);
        let host = Node {
            kind: template.kind.clone(),
            attributes: template.attributes.clone(),
            children: Vec::new(),
            parent: None,
            identity: OnceLock::from(template.identity.clone()),
            raw: None,
        };
        let host_id = NodeId(self.nodes.len());
        self.nodes.push(host);

        for &child in &children {
            self.nodes[child.0].parent = Some(host_id);
        }
        self.nodes[host_id.0].children = children;
        host_id
    }

    /// Nearest ancestor first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Depth-first, document order, including `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of every text leaf below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            let node = self.get(n);
            if let Some(text) = node.as_text() {
                out.push_str(text);
            } else if let Some(raw) = node.raw_text() {
                out.push_str(raw);
            }
        }
        out
    }

    /// Diagnostic nodes (undefined or rejected) below `id`.
    pub fn diagnostics(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.get(n).is_diagnostic())
            .collect()
    }

    /// Compact structural dump, e.g. `tkml(p("hi" b("bold")))`.
    pub fn outline(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_outline(id, &mut out);
        out
    }

    fn write_outline(&self, id: NodeId, out: &mut String) {
        let node = self.get(id);
        match node.kind() {
            NodeKind::Text(text) => {
                let _ = write!(out, "{:?}", text);
                return;
            }
            NodeKind::Error { message } => {
                let _ = write!(out, "error({:?})", message);
                return;
            }
            NodeKind::Undefined { tag } => {
                let _ = write!(out, "undefined[{}]", tag);
            }
            NodeKind::Element(spec) => out.push_str(spec.tag()),
        }

        if let Some(raw) = node.raw_text() {
            let _ = write!(out, "({:?})", raw);
            return;
        }
        if node.children.is_empty() {
            return;
        }
        out.push('(');
        for (i, &child) in node.children.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write_outline(child, out);
        }
        out.push(')');
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("outline", &self.outline(self.root))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::KindRegistry;

    fn tree() -> (KindRegistry, Tree) {
        let registry = KindRegistry::builtin();
        let tree = Tree::new(registry.root(), Arc::new(IdGenerator::new(1)));
        (registry, tree)
    }

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_append_sets_parent() {
        let (registry, mut tree) = tree();
        let root = tree.root();
        let p = tree.append(
            root,
            Node::element(registry.lookup("p").unwrap().clone(), HashMap::new()),
        );
        let text = tree.append_text(p, "hi");

        assert_eq!(tree.parent(p), Some(root));
        assert_eq!(tree.parent(text), Some(p));
        assert_eq!(tree.children(root), &[p]);
        assert_eq!(tree.ancestors(text).collect::<Vec<_>>(), vec![p, root]);
    }

    #[test]
    fn test_text_coalesces() {
        let (_, mut tree) = tree();
        let root = tree.root();
        let a = tree.append_text(root, "he");
        let b = tree.append_text(root, "llo");
        assert_eq!(a, b);
        assert_eq!(tree.get(a).as_text(), Some("hello"));
        assert_eq!(tree.children(root).len(), 1);
    }

    #[test]
    fn test_identity_generated_once() {
        let (registry, mut tree) = tree();
        let root = tree.root();
        let p = tree.append(
            root,
            Node::element(registry.lookup("p").unwrap().clone(), HashMap::new()),
        );
        let first = tree.identity(p).to_string();
        assert_eq!(first, "p-1-1");
        assert_eq!(tree.identity(p), first);
    }

    #[test]
    fn test_explicit_identity_is_sanitized() {
        let (registry, mut tree) = tree();
        let root = tree.root();
        let list = tree.append(
            root,
            Node::element(
                registry.lookup("list").unwrap().clone(),
                attrs(&[("id", "main\"list")]),
            ),
        );
        assert_eq!(tree.identity(list), "mainlist");
        assert_eq!(tree.get(list).attr("id"), Some("main\"list"));
    }

    #[test]
    fn test_adopt_children() {
        let (registry, mut tree) = tree();
        let root = tree.root();
        let a = tree.append_text(root, "a");
        let desc = tree.append(
            root,
            Node::element(registry.lookup("desc").unwrap().clone(), HashMap::new()),
        );

        let template = DetachedNode {
            kind: NodeKind::Element(registry.lookup("list").unwrap().clone()),
            attributes: HashMap::new(),
            identity: "list-9-9".to_string(),
        };
        let host = tree.adopt_children(root, &template);

        assert!(tree.children(root).is_empty());
        assert_eq!(tree.children(host), &[a, desc]);
        assert_eq!(tree.parent(desc), Some(host));
        assert_eq!(tree.identity(host), "list-9-9");
    }

    #[test]
    fn test_outline_and_diagnostics() {
        let (registry, mut tree) = tree();
        let root = tree.root();
        let p = tree.append(
            root,
            Node::element(registry.lookup("p").unwrap().clone(), HashMap::new()),
        );
        tree.append_text(p, "hi");
        tree.append(root, Node::undefined("card", HashMap::new()));
        tree.append(root, Node::error("nope"));

        assert_eq!(
            tree.outline(root),
            "tkml(p(\"hi\") undefined[card] error(\"nope\"))"
        );
        assert_eq!(tree.diagnostics(root).len(), 2);
        assert_eq!(tree.text_content(root), "hi");
    }

    #[test]
    fn test_root_attributes() {
        let (_, mut tree) = tree();
        tree.set_root_attributes(attrs(&[("id", "page")]));
        assert_eq!(tree.identity(tree.root()), "page");
    }
}
