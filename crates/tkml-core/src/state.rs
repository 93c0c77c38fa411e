//! Navigation state owned by one runtime

use std::collections::HashMap;

use tkml_render::Attachment;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuState {
    /// Identity of the menu trigger on the current page
    pub trigger: Option<String>,
    pub content_url: Option<String>,
    pub open: bool,
}

/// A loader waiting for its element to become visible.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLoad {
    pub attachment: Attachment,
    pub href: String,
}

#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    /// Location of the page on screen
    pub location: Option<String>,
    pub host: Option<String>,
    /// First href ever loaded
    pub initial: Option<String>,
    pub menu: MenuState,
    observed: HashMap<String, PendingLoad>,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember_initial(&mut self, href: &str) {
        if self.initial.is_none() {
            self.initial = Some(href.to_string());
        }
    }

    pub fn commit(&mut self, location: &str, host: Option<String>) {
        self.location = Some(location.to_string());
        self.host = host;
    }

    /// Register `attachment` to load `href` once visible.
    ///
    /// Re-registering the same identity replaces the pending load.
    pub fn observe(&mut self, attachment: Attachment, href: String) {
        tracing::debug!(identity = %attachment.identity, href = %href, "Observing loader");
        self.observed
            .insert(attachment.identity.clone(), PendingLoad { attachment, href });
    }

    /// Remove and return the registration for `identity`.
    pub fn take_observed(&mut self, identity: &str) -> Option<PendingLoad> {
        self.observed.remove(identity)
    }

    pub fn is_observed(&self, identity: &str) -> bool {
        self.observed.contains_key(identity)
    }

    pub fn observed(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.observed.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn clear_observed(&mut self) {
        self.observed.clear();
    }

    /// Drop what belonged to the page being replaced.
    pub fn clear_page(&mut self) {
        self.menu = MenuState::default();
        self.clear_observed();
    }
}
