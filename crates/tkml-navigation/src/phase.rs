//! Navigation Phase State Machine
//!
//! ```text
//! Idle
//!   ↓ navigate
//! Resolving
//!   ↓ cached          ↓ not cached
//! CacheHit          Fetching
//!   │                 ↓ first chunk
//!   │               Streaming
//!   │                 ↓ ok          ↓ error
//!   │               Completed     Failed
//!   ↓                 ↓             ↓
//! Applying ←──────────┘           Reporting
//!   ↓ top-level only               ↓
//! Committing                      Idle
//!   ↓
//! Idle
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NavigationError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationPhase {
    /// Nothing in flight
    Idle,
    /// Turning the href into a location and a fetchable URL
    Resolving,
    /// Markup found in the cache
    CacheHit,
    /// Request issued, waiting for the response head
    Fetching,
    /// Chunks are being fed to the parser
    Streaming,
    /// Stream ended and the parser finished
    Completed,
    /// Rendered output handed to the host
    Applying,
    /// Location, host and history updated
    Committing,
    /// Transport, HTTP or parse failure
    Failed,
    /// Failure handed to the host
    Reporting,
}

impl NavigationPhase {
    /// Check if transition to another phase is valid
    pub fn can_transition_to(&self, target: NavigationPhase) -> bool {
        use NavigationPhase::*;
        match (self, target) {
            (Idle, Resolving) => true,
            // Resolving may stop early when the guard was armed or the URL is bad
            (Resolving, CacheHit | Fetching | Failed | Idle) => true,
            (CacheHit, Applying | Failed) => true,
            (Fetching, Streaming | Failed) => true,
            (Streaming, Completed | Failed) => true,
            (Completed, Applying) => true,
            // Partial and attachment navigations never commit
            (Applying, Committing | Idle) => true,
            (Committing, Idle) => true,
            (Failed, Reporting) => true,
            (Reporting, Idle) => true,
            // Same phase is always valid (no-op)
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationPhase::Idle => "idle",
            NavigationPhase::Resolving => "resolving",
            NavigationPhase::CacheHit => "cachehit",
            NavigationPhase::Fetching => "fetching",
            NavigationPhase::Streaming => "streaming",
            NavigationPhase::Completed => "completed",
            NavigationPhase::Applying => "applying",
            NavigationPhase::Committing => "committing",
            NavigationPhase::Failed => "failed",
            NavigationPhase::Reporting => "reporting",
        }
    }
}

impl std::fmt::Display for NavigationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NavigationPhase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(NavigationPhase::Idle),
            "resolving" => Ok(NavigationPhase::Resolving),
            "cachehit" => Ok(NavigationPhase::CacheHit),
            "fetching" => Ok(NavigationPhase::Fetching),
            "streaming" => Ok(NavigationPhase::Streaming),
            "completed" => Ok(NavigationPhase::Completed),
            "applying" => Ok(NavigationPhase::Applying),
            "committing" => Ok(NavigationPhase::Committing),
            "failed" => Ok(NavigationPhase::Failed),
            "reporting" => Ok(NavigationPhase::Reporting),
            _ => Err(format!("Unknown navigation phase: {}", s)),
        }
    }
}

/// One navigation from request to settle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationAttempt {
    pub id: u64,
    pub url: String,
    pub phase: NavigationPhase,
    pub started_at: DateTime<Utc>,
}

impl NavigationAttempt {
    pub fn new(id: u64, url: &str) -> Self {
        Self {
            id,
            url: url.to_string(),
            phase: NavigationPhase::Idle,
            started_at: Utc::now(),
        }
    }

    pub fn transition_to(&mut self, next: NavigationPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(NavigationError::InvalidTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(
            attempt = self.id,
            from = %self.phase,
            to = %next,
            "Navigation phase transition"
        );
        self.phase = next;
        Ok(())
    }
}
