//! Kind capability descriptors
//!
//! Every behavioural difference between kinds that the parser cares about is
//! data on a [`KindSpec`]: raw-text capture, self-closing and the set of
//! kinds allowed to contain it.

use std::collections::BTreeSet;

/// Tag of the document envelope.
pub const ROOT_TAG: &str = "tkml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSpec {
    tag: String,
    raw_text: bool,
    self_closing: bool,
    proxy: bool,
    /// `None` means any parent below the document root
    allowed_parents: Option<BTreeSet<String>>,
}

impl KindSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            raw_text: false,
            self_closing: false,
            proxy: false,
            allowed_parents: None,
        }
    }

    /// Restrict the kinds this one may be nested in.
    pub fn parents(mut self, parents: &[&str]) -> Self {
        self.allowed_parents = Some(parents.iter().map(|p| p.to_ascii_lowercase()).collect());
        self
    }

    /// Content between the open and close tag is captured verbatim.
    pub fn raw_text(mut self) -> Self {
        self.raw_text = true;
        self
    }

    /// The element never has content; an open tag closes itself.
    pub fn self_closing(mut self) -> Self {
        self.self_closing = true;
        self
    }

    /// Rendered as a plain element of the same name (`b`, `i`, ...).
    pub fn proxy(mut self) -> Self {
        self.proxy = true;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn allows_raw_text(&self) -> bool {
        self.raw_text
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    pub fn is_proxy(&self) -> bool {
        self.proxy
    }

    pub fn allowed_parents(&self) -> Option<&BTreeSet<String>> {
        self.allowed_parents.as_ref()
    }

    pub fn allows_parent(&self, parent: &str) -> bool {
        match &self.allowed_parents {
            Some(parents) => parents.contains(parent),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_kind() {
        let spec = KindSpec::new("Desc");
        assert_eq!(spec.tag(), "desc");
        assert!(spec.allows_parent("anything"));
        assert!(spec.allowed_parents().is_none());
    }

    #[test]
    fn test_restricted_kind() {
        let spec = KindSpec::new("back").parents(&["header"]);
        assert!(spec.allows_parent("header"));
        assert!(!spec.allows_parent("tkml"));
    }

    #[test]
    fn test_flags() {
        let code = KindSpec::new("code").raw_text();
        assert!(code.allows_raw_text());
        assert!(!code.is_self_closing());

        let br = KindSpec::new("br").self_closing();
        assert!(br.is_self_closing());
        assert!(!br.is_proxy());
    }
}
