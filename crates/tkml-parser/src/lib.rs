//! TKML Streaming Parser
//!
//! Parses markup as it arrives. Each response gets its own [`Parser`]; the
//! caller pushes chunks with [`Parser::add`] / [`Parser::add_bytes`] and
//! completes with [`Parser::finish`]. The result does not depend on how the
//! input was split into chunks.

mod entities;
mod envelope;
mod error;
mod parser;
mod tokenizer;
mod utf8;

pub use entities::decode_entities;
pub use envelope::Envelope;
pub use error::ParseError;
pub use parser::{ParseOutput, ParseTarget, Parser};
pub use tokenizer::{Token, Tokenizer};
pub use utf8::Utf8Decoder;

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, ParseError>;
