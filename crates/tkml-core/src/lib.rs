//! TKML Core
//!
//! The navigation runtime: resolves hrefs, serves pages from the cache or
//! streams them into the parser, applies the rendered output to the host
//! and keeps location and history in step.

mod config;
mod error;
mod host;
mod loader;
mod runtime;
mod state;

pub use config::Config;
pub use error::CoreError;
pub use host::{Host, HostOp, RecordingHost};
pub use loader::Loader;
pub use runtime::{NavigateOptions, NavigationOutcome, Runtime};
pub use state::{MenuState, NavigationState, PendingLoad};

// Re-export the layers a host needs to drive the runtime
pub use tkml_dom::{KindRegistry, KindSpec, Tree};
pub use tkml_fetch::{Fetch, FetchError, HttpFetcher, MemoryFetcher};
pub use tkml_navigation::{CacheStore, HistoryBridge, HistoryMode, NavigationError};
pub use tkml_parser::{Envelope, ParseError, ParseTarget, Parser};
pub use tkml_render::{Attachment, Effect, HostTarget, HtmlRenderer, Render, Surface};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
