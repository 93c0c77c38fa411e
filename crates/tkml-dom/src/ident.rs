//! Node identities

use std::sync::atomic::{AtomicU64, Ordering};

/// Strip everything outside `[a-zA-Z0-9-_ ,]` so an identity can be
/// embedded in markup and used as a host element id.
pub fn sanitize_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' ' | ','))
        .collect()
}

/// Hands out generated identities of the form `{kind}-{runtime}-{counter}`.
///
/// One generator is shared by every tree a runtime parses, so identities
/// stay unique across navigations.
#[derive(Debug)]
pub struct IdGenerator {
    runtime_id: u64,
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new(runtime_id: u64) -> Self {
        Self {
            runtime_id,
            counter: AtomicU64::new(0),
        }
    }

    pub fn runtime_id(&self) -> u64 {
        self.runtime_id
    }

    pub fn next(&self, kind: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}-{}", kind, self.runtime_id, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("main-list"), "main-list");
        assert_eq!(sanitize_id("a,b c_d"), "a,b c_d");
        assert_eq!(sanitize_id("x\"><script>"), "xscript");
        assert_eq!(sanitize_id("<>"), "");
    }

    #[test]
    fn test_generator_is_monotonic() {
        let ids = IdGenerator::new(3);
        assert_eq!(ids.next("p"), "p-3-1");
        assert_eq!(ids.next("loader"), "loader-3-2");
        assert_eq!(ids.runtime_id(), 3);
    }
}
