//! TKML Fetch
//!
//! A request is a future that resolves to either a failure or a response
//! head plus a stream of body chunks. The parser consumes the chunks as
//! they arrive.

mod error;
mod http;
mod memory;
mod request;

pub use error::FetchError;
pub use http::HttpFetcher;
pub use memory::MemoryFetcher;
pub use request::{FetchRequest, FetchResponse, Method, TKML_MIME};

use futures_util::future::BoxFuture;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Issue one request.
pub trait Fetch: Send + Sync {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse>>;
}
