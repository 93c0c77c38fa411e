//! Kind registry
//!
//! Built once at startup, then shared behind an `Arc` and only read.

use std::collections::HashMap;
use std::sync::Arc;

use crate::kind::{KindSpec, ROOT_TAG};

#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: HashMap<String, Arc<KindSpec>>,
}

impl KindRegistry {
    /// An empty registry that only knows the document root.
    pub fn new() -> Self {
        let mut registry = Self {
            kinds: HashMap::new(),
        };
        registry.register(KindSpec::new(ROOT_TAG));
        registry
    }

    /// Registry preloaded with every built-in kind.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        for spec in [
            KindSpec::new("title").parents(&["tkml", "section", "bubble", "info"]),
            KindSpec::new("desc"),
            KindSpec::new("alert"),
            KindSpec::new("p").parents(&["info", "desc", "section", "tkml"]),
            KindSpec::new("br")
                .parents(&["p", "info", "desc", "title", "section", "tkml"])
                .self_closing(),
            KindSpec::new("w").parents(&["desc", "title", "section", "tkml"]),
            KindSpec::new("small"),
            KindSpec::new("bullet"),
            KindSpec::new("pill").parents(&["info", "tkml", "desc", "title", "section"]),
            KindSpec::new("list").parents(&["tkml"]),
            KindSpec::new("info").parents(&["tkml"]),
            KindSpec::new("section").parents(&["list", "info"]),
            KindSpec::new("checkbox").parents(&["list", "info", "tkml"]),
            KindSpec::new("radio").parents(&["list", "info", "tkml"]),
            KindSpec::new("box").parents(&["tkml", "section", "list", "info", "footer"]),
            KindSpec::new("center")
                .parents(&["tkml", "section", "list", "info", "footer", "box"]),
            KindSpec::new("quote")
                .parents(&["tkml", "section", "list", "info", "bubble", "footer"]),
            KindSpec::new("navigation").parents(&["tkml", "footer"]),
            KindSpec::new("next").parents(&["navigation"]),
            KindSpec::new("prev").parents(&["navigation"]),
            KindSpec::new("page").parents(&["navigation"]),
            KindSpec::new("header"),
            KindSpec::new("back").parents(&["header"]),
            KindSpec::new("menu").parents(&["header"]).self_closing(),
            KindSpec::new("footer"),
            KindSpec::new("bar").parents(&["tkml"]),
            KindSpec::new("tab").parents(&["bar"]),
            KindSpec::new("dropdown").parents(&["tkml"]),
            KindSpec::new("option").parents(&["dropdown"]),
            KindSpec::new("autoupdate").parents(&["tkml"]).self_closing(),
            KindSpec::new("plugin").parents(&["tkml"]).self_closing(),
            KindSpec::new("code").raw_text(),
            KindSpec::new("loader"),
            KindSpec::new("bubble"),
            KindSpec::new("label"),
            KindSpec::new("msg"),
            KindSpec::new("img").self_closing(),
            KindSpec::new("input"),
            KindSpec::new("textarea"),
            KindSpec::new("button"),
            KindSpec::new("a"),
            KindSpec::new("b").proxy(),
            KindSpec::new("i").proxy(),
            KindSpec::new("u").proxy(),
            KindSpec::new("s").proxy(),
        ] {
            registry.register(spec);
        }

        registry
    }

    /// Register a kind, returning the descriptor it replaced.
    pub fn register(&mut self, spec: KindSpec) -> Option<Arc<KindSpec>> {
        let previous = self.kinds.insert(spec.tag().to_string(), Arc::new(spec));
        if let Some(previous) = &previous {
            tracing::debug!(tag = %previous.tag(), "Replaced kind registration");
        }
        previous
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, tag: &str) -> Option<&Arc<KindSpec>> {
        match self.kinds.get(tag) {
            Some(spec) => Some(spec),
            None => self.kinds.get(&tag.to_ascii_lowercase()),
        }
    }

    pub fn root(&self) -> Arc<KindSpec> {
        self.kinds
            .get(ROOT_TAG)
            .cloned()
            .unwrap_or_else(|| Arc::new(KindSpec::new(ROOT_TAG)))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
