//! TKML Render Dispatch
//!
//! Turns a parsed [`Tree`](tkml_dom::Tree) into markup through the [`Render`]
//! contract and writes it to the host through [`Surface`].
//!
//! Rendering is otherwise pure; anything a kind wants done after its markup
//! is on screen (preloading a link, watching a loader) is returned as an
//! [`Effect`] for the runtime to carry out.

mod context;
pub mod escape;
mod html;
mod surface;

pub use context::{Attachment, Effect, RenderContext};
pub use html::HtmlRenderer;
pub use surface::{HostTarget, Surface};

use tkml_dom::{NodeId, Tree};

pub trait Render: Send + Sync {
    fn render(&self, cx: &mut RenderContext<'_>, node: NodeId) -> String;

    /// Render `children` as they would appear inside `parent`.
    fn render_children(
        &self,
        cx: &mut RenderContext<'_>,
        parent: NodeId,
        children: &[NodeId],
    ) -> String {
        let _ = parent;
        children.iter().map(|&c| self.render(cx, c)).collect()
    }

    /// Host element to replace when a child of `parent` carrying
    /// `identity` is swapped for new content.
    ///
    /// Kinds that wrap each child in extra structure answer with the
    /// wrapper instead of the element itself.
    fn wrapping_host(&self, tree: &Tree, parent: NodeId, identity: &str) -> HostTarget {
        let _ = (tree, parent);
        HostTarget::Element(identity.to_string())
    }
}
