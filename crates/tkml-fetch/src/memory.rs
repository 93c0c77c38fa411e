//! In-memory fetcher
//!
//! Serves registered routes, split into fixed-size chunks, and records
//! every request it sees.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream;
use futures_util::{FutureExt, StreamExt};
use parking_lot::RwLock;

use crate::error::FetchError;
use crate::request::{FetchRequest, FetchResponse};
use crate::{Fetch, Result};

#[derive(Debug, Clone)]
enum Body {
    Complete(String),
    /// Yields the prefix, then fails mid-stream
    Broken { prefix: String, message: String },
    Unreachable(String),
}

#[derive(Debug, Clone)]
struct Route {
    status: u16,
    body: Body,
    delay: Option<Duration>,
}

pub struct MemoryFetcher {
    routes: Arc<RwLock<HashMap<String, Route>>>,
    requests: Arc<RwLock<Vec<FetchRequest>>>,
    chunk_size: usize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            chunk_size: 16,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn route(&self, url: &str, body: &str) -> &Self {
        self.insert(url, 200, Body::Complete(body.to_string()))
    }

    pub fn route_status(&self, url: &str, status: u16, body: &str) -> &Self {
        self.insert(url, status, Body::Complete(body.to_string()))
    }

    pub fn route_broken(&self, url: &str, prefix: &str, message: &str) -> &Self {
        self.insert(
            url,
            200,
            Body::Broken {
                prefix: prefix.to_string(),
                message: message.to_string(),
            },
        )
    }

    pub fn route_unreachable(&self, url: &str, message: &str) -> &Self {
        self.insert(url, 0, Body::Unreachable(message.to_string()))
    }

    /// Hold the response head back for `delay`.
    pub fn delay(&self, url: &str, delay: Duration) -> &Self {
        if let Some(route) = self.routes.write().get_mut(url) {
            route.delay = Some(delay);
        }
        self
    }

    fn insert(&self, url: &str, status: u16, body: Body) -> &Self {
        self.routes.write().insert(
            url.to_string(),
            Route {
                status,
                body,
                delay: None,
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.read().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requests
            .read()
            .iter()
            .filter(|r| r.url.as_str() == url)
            .count()
    }

    fn split(&self, body: &str) -> Vec<Result<Vec<u8>>> {
        body.as_bytes()
            .chunks(self.chunk_size)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect()
    }
}

impl Default for MemoryFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryFetcher {
    fn clone(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            requests: Arc::clone(&self.requests),
            chunk_size: self.chunk_size,
        }
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse>> {
        self.requests.write().push(request.clone());
        let route = self.routes.read().get(request.url.as_str()).cloned();

        let outcome = match route {
            None => Err(FetchError::Http {
                url: request.url.to_string(),
                status: 404,
            }),
            Some(route) => {
                let url = request.url.clone();
                let chunks = match route.body {
                    Body::Unreachable(message) => Err(FetchError::Transport {
                        url: url.to_string(),
                        message,
                    }),
                    _ if !(200..300).contains(&route.status) => Err(FetchError::Http {
                        url: url.to_string(),
                        status: route.status,
                    }),
                    Body::Complete(body) => Ok(self.split(&body)),
                    Body::Broken { prefix, message } => {
                        let mut chunks = self.split(&prefix);
                        chunks.push(Err(FetchError::Transport {
                            url: url.to_string(),
                            message,
                        }));
                        Ok(chunks)
                    }
                };
                chunks.map(|chunks| (route.status, route.delay, chunks))
            }
        };

        async move {
            let (status, delay, chunks) = outcome?;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(FetchResponse {
                url: request.url,
                status,
                chunks: stream::iter(chunks).boxed(),
            })
        }
        .boxed()
    }
}
