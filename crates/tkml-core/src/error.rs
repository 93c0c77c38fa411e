//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Navigation error: {0}")]
    Navigation(#[from] tkml_navigation::NavigationError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] tkml_fetch::FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] tkml_parser::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
