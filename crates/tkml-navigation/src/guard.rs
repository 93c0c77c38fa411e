//! Guarded navigation
//!
//! A pre-navigation check arms the flag; the next navigation takes it and
//! returns without effect.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct AbortFlag(AtomicBool);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        tracing::debug!("Navigation guard armed");
        self.0.store(true, Ordering::SeqCst);
    }

    /// Observe and clear. Returns true when the flag was armed.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Required fields from a comma-separated id list that are missing or blank.
///
/// Order follows the list, so the first entry is the field to scroll to.
pub fn invalid_fields<F>(ids: &str, value_of: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| value_of(id).map_or(true, |value| value.trim().is_empty()))
        .map(String::from)
        .collect()
}
