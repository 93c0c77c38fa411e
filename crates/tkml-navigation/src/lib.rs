//! TKML Navigation
//!
//! The stateful pieces behind page-to-page navigation:
//! - URL resolution relative to the current document location and host
//! - Response cache keyed by fully expanded URL
//! - History bridge between logical locations and the visible address
//! - Per-attempt phase tracking
//! - Guard flag and required-field validation for guarded navigation

mod cache;
mod error;
mod guard;
mod history;
mod phase;
mod resolve;

pub use cache::{CacheEntry, CacheStore};
pub use error::NavigationError;
pub use guard::{invalid_fields, AbortFlag};
pub use history::{HistoryBridge, HistoryEntry, HistoryMode};
pub use phase::{NavigationAttempt, NavigationPhase};
pub use resolve::{Resolution, UrlResolver};

pub type Result<T> = std::result::Result<T, NavigationError>;
