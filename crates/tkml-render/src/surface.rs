//! Host surface contract

use std::error::Error;

/// An existing host element addressed by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostTarget {
    /// The element carrying this identity
    Element(String),
    /// The direct parent of the element carrying this identity
    ParentOf(String),
}

impl HostTarget {
    pub fn identity(&self) -> &str {
        match self {
            HostTarget::Element(id) | HostTarget::ParentOf(id) => id,
        }
    }
}

/// Where rendered markup lands.
pub trait Surface: Send + Sync {
    /// Replace the host element (outer markup) addressed by `target`.
    fn replace_element(&self, target: &HostTarget, markup: &str);

    /// Replace the whole page root contents.
    fn replace_root(&self, markup: &str);

    /// A parse could not complete. Nothing has been replaced for it.
    fn failed(&self, error: &(dyn Error + 'static)) {
        tracing::warn!(error = %error, "Parse failed");
    }
}
