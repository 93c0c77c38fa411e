//! Runtime configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use tkml_navigation::{HistoryMode, UrlResolver};
use tkml_parser::Envelope;

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin attached to host- and root-relative locations
    pub origin: String,
    /// How committed locations appear in the address bar
    pub history_mode: HistoryMode,
    /// Query parameter carrying the location in query mode
    pub history_param: String,
    /// Page restored when the address bar carries no location
    pub root_url: Option<String>,
    /// Cached responses older than this are refetched
    pub cache_ttl_secs: Option<u64>,
    /// Below this viewport width menus close after each page load
    pub narrow_layout_width: u32,
    pub user_agent: Option<String>,
    pub envelope: Envelope,
}

impl Config {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading configuration");
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.resolver()?;
        if self.history_param.trim().is_empty() {
            return Err(CoreError::Config("history_param must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn resolver(&self) -> Result<UrlResolver> {
        UrlResolver::parse(&self.origin).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn cache_ttl(&self) -> Option<chrono::Duration> {
        self.cache_ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: "http://localhost".to_string(),
            history_mode: HistoryMode::Query,
            history_param: "l".to_string(),
            root_url: None,
            cache_ttl_secs: None,
            narrow_layout_width: 768,
            user_agent: None,
            envelope: Envelope::Detect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.history_mode, HistoryMode::Query);
        assert_eq!(config.history_param, "l");
        assert_eq!(config.narrow_layout_width, 768);
        assert!(config.cache_ttl().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = Config::from_json(
            r#"{ "origin": "https://app.example", "history_mode": "hash", "cache_ttl_secs": 30, "envelope": "synthesize" }"#,
        )
        .unwrap();
        assert_eq!(config.origin, "https://app.example");
        assert_eq!(config.history_mode, HistoryMode::Hash);
        assert_eq!(config.envelope, Envelope::Synthesize);
        assert_eq!(config.cache_ttl(), Some(chrono::Duration::seconds(30)));
        assert_eq!(config.narrow_layout_width, 768);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::from_json(r#"{ "origin": "nowhere" }"#),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "history_mode": "router" }"#),
            Err(CoreError::Serialization(_))
        ));
        assert!(matches!(
            Config::load("/nonexistent/tkml.json"),
            Err(CoreError::Io(_))
        ));
    }
}
