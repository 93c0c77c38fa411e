//! History bridge
//!
//! Maps between the logical location of a page and what the host shows in
//! its address bar. What gets fetched is always the expanded URL; the
//! visible form only has to round-trip back to a location.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

use crate::error::NavigationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// The location is shown as the address path
    Path,
    /// The location is shown as a fragment (`#/a/b.page`)
    Hash,
    /// The expanded URL is carried in a query parameter (`?l=...`)
    #[default]
    Query,
}

impl HistoryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryMode::Path => "path",
            HistoryMode::Hash => "hash",
            HistoryMode::Query => "query",
        }
    }
}

impl std::fmt::Display for HistoryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HistoryMode {
    type Err = NavigationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "path" => Ok(HistoryMode::Path),
            "hash" => Ok(HistoryMode::Hash),
            "query" => Ok(HistoryMode::Query),
            _ => Err(NavigationError::UnknownHistoryMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub location: String,
    pub visible: String,
    pub pushed_at: DateTime<Utc>,
}

pub struct HistoryBridge {
    mode: HistoryMode,
    param: String,
    entries: Arc<RwLock<Vec<HistoryEntry>>>,
}

impl HistoryBridge {
    pub fn new(mode: HistoryMode) -> Self {
        Self {
            mode,
            param: "l".to_string(),
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Query parameter used in [`HistoryMode::Query`].
    pub fn with_param(mut self, param: &str) -> Self {
        self.param = param.to_string();
        self
    }

    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    /// Address-bar form for a committed location.
    pub fn visible_for(&self, location: &str, expanded: &Url) -> String {
        match self.mode {
            HistoryMode::Path => location.to_string(),
            HistoryMode::Hash => format!("#{}", location),
            HistoryMode::Query => {
                let encoded: String = form_urlencoded::byte_serialize(expanded.as_str().as_bytes()).collect();
                format!("?{}={}", self.param, encoded)
            }
        }
    }

    /// Recover the href to restore from the visible form.
    ///
    /// `None` when the visible form carries no location.
    pub fn location_from_visible(&self, visible: &str) -> Option<String> {
        let visible = visible.trim();
        let location = match self.mode {
            HistoryMode::Path => visible.split('#').next().unwrap_or_default().to_string(),
            HistoryMode::Hash => {
                // The location may carry its own fragment
                let fragment = visible.split_once('#').map(|(_, f)| f).unwrap_or_default();
                fragment.to_string()
            }
            HistoryMode::Query => {
                let query = visible
                    .split_once('?')
                    .map(|(_, q)| q)
                    .unwrap_or_default();
                let query = query.split('#').next().unwrap_or_default();
                form_urlencoded::parse(query.as_bytes())
                    .find(|(key, _)| key == self.param.as_str())
                    .map(|(_, value)| value.into_owned())
                    .unwrap_or_default()
            }
        };

        if location.is_empty() || (self.mode == HistoryMode::Path && location == "/") {
            None
        } else {
            Some(location)
        }
    }

    /// Whether pushing `visible` would change what the host shows.
    pub fn should_push(&self, current_visible: &str, visible: &str) -> bool {
        match self.mode {
            HistoryMode::Query => {
                self.location_from_visible(current_visible) != self.location_from_visible(visible)
            }
            _ => current_visible != visible,
        }
    }

    pub fn record(&self, location: &str, visible: &str) {
        tracing::debug!(location = %location, visible = %visible, "History push");
        self.entries.write().push(HistoryEntry {
            location: location.to_string(),
            visible: visible.to_string(),
            pushed_at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for HistoryBridge {
    fn default() -> Self {
        Self::new(HistoryMode::default())
    }
}

impl Clone for HistoryBridge {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            param: self.param.clone(),
            entries: Arc::clone(&self.entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_path_mode() {
        let bridge = HistoryBridge::new(HistoryMode::Path);
        let visible = bridge.visible_for("/a/b.page", &url("http://h/a/b.page"));
        assert_eq!(visible, "/a/b.page");
        assert_eq!(bridge.location_from_visible(&visible).as_deref(), Some("/a/b.page"));
        assert_eq!(bridge.location_from_visible("/"), None);
    }

    #[test]
    fn test_hash_mode() {
        let bridge = HistoryBridge::new(HistoryMode::Hash);
        let visible = bridge.visible_for("/a/b.page", &url("http://h/a/b.page"));
        assert_eq!(visible, "#/a/b.page");
        assert_eq!(
            bridge.location_from_visible("/app/#/a/b.page").as_deref(),
            Some("/a/b.page")
        );
        assert_eq!(bridge.location_from_visible("/app/"), None);
    }

    #[test]
    fn test_hash_mode_keeps_location_fragment() {
        let bridge = HistoryBridge::new(HistoryMode::Hash);
        let visible = bridge.visible_for("/d/a.page#sec", &url("http://h/d/a.page#sec"));
        assert_eq!(visible, "#/d/a.page#sec");
        assert_eq!(
            bridge.location_from_visible(&format!("/app/{}", visible)).as_deref(),
            Some("/d/a.page#sec")
        );
    }

    #[test]
    fn test_query_mode_round_trips_expanded_url() {
        let bridge = HistoryBridge::new(HistoryMode::Query);
        let expanded = url("https://other.example/x.page?p=1&q=2");
        let visible = bridge.visible_for("//other.example/x.page?p=1&q=2", &expanded);
        assert!(visible.starts_with("?l=https%3A%2F%2Fother.example"));
        assert_eq!(
            bridge.location_from_visible(&format!("/index.html{}", visible)).as_deref(),
            Some(expanded.as_str())
        );
        assert_eq!(bridge.location_from_visible("/index.html"), None);
        assert_eq!(bridge.location_from_visible("/index.html?other=1"), None);
    }

    #[test]
    fn test_custom_param() {
        let bridge = HistoryBridge::new(HistoryMode::Query).with_param("page");
        let visible = bridge.visible_for("/a", &url("http://h/a"));
        assert_eq!(visible, "?page=http%3A%2F%2Fh%2Fa");
    }

    #[test]
    fn test_should_push() {
        let bridge = HistoryBridge::new(HistoryMode::Query);
        let visible = bridge.visible_for("/a", &url("http://h/a"));
        assert!(!bridge.should_push(&format!("/index{}", visible), &visible));
        assert!(bridge.should_push("/index", &visible));

        let bridge = HistoryBridge::new(HistoryMode::Path);
        assert!(!bridge.should_push("/a", "/a"));
        assert!(bridge.should_push("/a", "/b"));
    }

    #[test]
    fn test_record() {
        let bridge = HistoryBridge::default();
        assert!(bridge.is_empty());
        bridge.record("/a", "?l=x");
        let shared = bridge.clone();
        shared.record("/b", "?l=y");
        assert_eq!(bridge.len(), 2);
        assert_eq!(shared.entries.read()[1].location, "/b");
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Hash".parse::<HistoryMode>().unwrap(), HistoryMode::Hash);
        assert!("router".parse::<HistoryMode>().is_err());
        assert_eq!(HistoryMode::Query.to_string(), "query");
    }
}
