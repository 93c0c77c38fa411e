//! Guarded click surface
//!
//! What a rendered link or button calls. Creating a loader consumes an
//! armed guard, in which case every load through it does nothing.

use serde_json::{Map, Value};
use tkml_navigation::NavigationError;
use url::form_urlencoded;

use crate::error::CoreError;
use crate::runtime::{NavigateOptions, NavigationOutcome, Runtime};
use crate::Result;

pub struct Loader<'a> {
    runtime: &'a Runtime,
    element: Option<String>,
    target: Option<String>,
    bypass_cache: bool,
    cancelled: bool,
}

impl<'a> Loader<'a> {
    pub(crate) fn new(runtime: &'a Runtime, element: Option<&str>) -> Self {
        let cancelled = runtime.guard().take();
        if cancelled {
            tracing::debug!(element = ?element, "Loader cancelled by guard");
        } else if let Some(element) = element {
            runtime.host().set_loading(element, true);
        }

        Self {
            runtime,
            element: element.map(String::from),
            target: None,
            bypass_cache: false,
            cancelled,
        }
    }

    /// Replace only these comma-separated identities. Always refetches.
    pub fn target(mut self, ids: &str) -> Self {
        self.target = Some(ids.to_string());
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub async fn go(self, href: &str) -> Result<NavigationOutcome> {
        let bypass_cache = self.bypass_cache || self.target.is_some();
        self.run(href, None, bypass_cache).await
    }

    /// POST `params` as a JSON object.
    pub async fn post(self, href: &str, params: Map<String, Value>) -> Result<NavigationOutcome> {
        self.run(href, Some(Value::Object(params)), true).await
    }

    /// POST a query string (`a=1&b=2`) as a JSON object. Without `href`
    /// the current page is the endpoint.
    pub async fn load_post(self, href: Option<&str>, query: &str) -> Result<NavigationOutcome> {
        if self.cancelled {
            return Ok(NavigationOutcome::Aborted);
        }

        let href = match href {
            Some(href) => href.to_string(),
            None => match self.runtime.location() {
                Some(location) => location,
                None => {
                    if let Some(element) = &self.element {
                        self.runtime.host().set_loading(element, false);
                    }
                    return Err(CoreError::Navigation(NavigationError::InvalidUrl(
                        "no current location to post to".to_string(),
                    )));
                }
            },
        };

        let params: Map<String, Value> = form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect();
        self.post(&href, params).await
    }

    async fn run(self, href: &str, body: Option<Value>, bypass_cache: bool) -> Result<NavigationOutcome> {
        if self.cancelled {
            return Ok(NavigationOutcome::Aborted);
        }
        let options = NavigateOptions {
            add_to_history: true,
            body,
            bypass_cache,
            target: self.target,
            attachment: None,
            loading_marker: self.element,
        };
        self.runtime.navigate(href, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::host::{HostOp, RecordingHost};
    use std::sync::Arc;
    use tkml_fetch::MemoryFetcher;

    #[tokio::test]
    async fn test_load_post_without_location_fails() {
        let host = RecordingHost::new();
        let runtime = Runtime::new(
            Config::default(),
            Arc::new(host.clone()),
            Arc::new(MemoryFetcher::new()),
        )
        .unwrap();

        let err = runtime
            .loader(Some("send"))
            .load_post(None, "a=1")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Navigation(NavigationError::InvalidUrl(_))));
        assert!(host.contains(&HostOp::Loading("send".to_string(), false)));
    }

    #[tokio::test]
    async fn test_cancelled_loader_ignores_every_call() {
        let host = RecordingHost::new();
        let fetcher = MemoryFetcher::new();
        let runtime = Runtime::new(
            Config::default(),
            Arc::new(host.clone()),
            Arc::new(fetcher.clone()),
        )
        .unwrap();

        runtime.validate_fields("missing");
        let loader = runtime.loader(None);
        assert!(loader.is_cancelled());
        let outcome = loader.load_post(None, "a=1").await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Aborted);
        assert_eq!(fetcher.request_count(), 0);
    }
}
