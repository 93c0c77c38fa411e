//! Render context and deferred effects

use tkml_dom::{DetachedNode, NodeId, Tree};

/// Slot whose host element gets replaced by the children of a later parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Identity of the placeholder element
    pub identity: String,
    /// The placeholder's parent; the parsed children are rendered as its
    /// children. `None` renders them as a standalone fragment.
    pub parent: Option<DetachedNode>,
}

impl Attachment {
    /// Attachment for `node`, remembering its parent.
    pub fn for_node(tree: &Tree, node: NodeId) -> Self {
        Self {
            identity: tree.identity(node).to_string(),
            parent: tree.parent(node).map(|p| tree.detach(p)),
        }
    }
}

/// Work requested during rendering, run once the markup is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Warm the cache for this href
    Preload(String),
    /// Load `href` into `attachment` once its element becomes visible
    LazyLoad { attachment: Attachment, href: String },
    /// A menu trigger rendered into the page
    Menu { trigger: String, content_url: String },
}

pub struct RenderContext<'a> {
    tree: &'a Tree,
    runtime_id: u64,
    effects: Vec<Effect>,
}

impl<'a> RenderContext<'a> {
    pub fn new(tree: &'a Tree, runtime_id: u64) -> Self {
        Self {
            tree,
            runtime_id,
            effects: Vec::new(),
        }
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn runtime_id(&self) -> u64 {
        self.runtime_id
    }

    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }
}
