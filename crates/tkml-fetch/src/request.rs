use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::Value;
use url::Url;

use crate::Result;

pub const TKML_MIME: &str = "application/tkml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: Url,
    /// Sent as JSON; a request with a body is a POST
    pub body: Option<Value>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self { url, body: None }
    }

    pub fn post(url: Url, body: Value) -> Self {
        Self {
            url,
            body: Some(body),
        }
    }

    pub fn method(&self) -> Method {
        if self.body.is_some() {
            Method::Post
        } else {
            Method::Get
        }
    }
}

pub struct FetchResponse {
    pub url: Url,
    pub status: u16,
    pub chunks: BoxStream<'static, Result<Vec<u8>>>,
}

impl FetchResponse {
    /// Drain the body into a string, replacing invalid UTF-8.
    pub async fn text(mut self) -> Result<String> {
        let mut body = Vec::new();
        while let Some(chunk) = self.chunks.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
