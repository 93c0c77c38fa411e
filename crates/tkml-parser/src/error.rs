//! Parser error types

use thiserror::Error;

/// Tokenizer failures. Structural problems (bad nesting, unknown kinds)
/// are never errors; they become diagnostic nodes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed tag at byte {offset}: {reason}")]
    MalformedTag { offset: usize, reason: String },

    #[error("Unterminated tag at byte {offset}")]
    UnterminatedTag { offset: usize },

    #[error("Unterminated comment at byte {offset}")]
    UnterminatedComment { offset: usize },

    #[error("Invalid close tag at byte {offset}: </{name}>")]
    InvalidCloseTag { offset: usize, name: String },
}
