//! Document envelope handling
//!
//! Markup may omit its outer `<tkml>` tag. The parser then opens the
//! document node itself, so fragments and full documents parse the same.

use serde::{Deserialize, Serialize};

/// How the parser decides whether the input carries its own envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    /// Look at the start of the input: optional whitespace and comments,
    /// then `<tkml`
    #[default]
    Detect,
    /// The input is a fragment; always open the document node
    Synthesize,
    /// The input starts with its own `<tkml>` tag
    Present,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sniff {
    Present,
    Absent,
    /// The buffered prefix cannot decide yet
    Undecided,
}

/// Inspect the leading input. With `eof`, never answers `Undecided`.
pub(crate) fn sniff(input: &str, eof: bool) -> Sniff {
    const OPEN: &str = "<tkml";
    const COMMENT: &str = "<!--";

    let mut rest = input.trim_start();
    loop {
        if let Some(body) = rest.strip_prefix(COMMENT) {
            match body.find("-->") {
                Some(end) => rest = body[end + 3..].trim_start(),
                None if eof => return Sniff::Absent,
                None => return Sniff::Undecided,
            }
        } else {
            break;
        }
    }

    if rest.starts_with(OPEN) {
        return Sniff::Present;
    }
    let waiting = rest.len() < OPEN.len() && (OPEN.starts_with(rest) || COMMENT.starts_with(rest));
    if waiting && !eof {
        Sniff::Undecided
    } else {
        Sniff::Absent
    }
}
