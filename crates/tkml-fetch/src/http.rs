//! reqwest-backed fetcher

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use reqwest::header::ACCEPT;

use crate::error::FetchError;
use crate::request::{FetchRequest, FetchResponse, Method, TKML_MIME};
use crate::{Fetch, Result};

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse>> {
        let client = self.client.clone();
        async move {
            let url = request.url.clone();
            tracing::debug!(url = %url, method = ?request.method(), "Fetching");

            let mut builder = match request.method() {
                Method::Get => client.get(url.clone()),
                Method::Post => client.post(url.clone()),
            };
            builder = builder.header(ACCEPT, TKML_MIME);
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Http {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let stream_url = url.to_string();
            let chunks = response
                .bytes_stream()
                .map(move |chunk| {
                    chunk.map(|bytes| bytes.to_vec()).map_err(|e| FetchError::Transport {
                        url: stream_url.clone(),
                        message: e.to_string(),
                    })
                })
                .boxed();

            Ok(FetchResponse {
                url,
                status: status.as_u16(),
                chunks,
            })
        }
        .boxed()
    }
}
