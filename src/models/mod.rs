// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains the data structures shared across the application,
//! organized by their primary purpose.

mod config;
mod record;
mod repo;

// Re-export all public types
pub use config::{
    AuxiliaryConfig, CollectionConfig, Config, FilterConfig, GithubConfig, LoggingConfig,
    NotifyConfig,
};
pub use record::{LedgerEntry, TIMESTAMP_FORMAT};
pub use repo::{CandidateMatch, RepoKey};

/// Decision taken by the operator for one previewed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// Capture the repository
    Accept,
    /// Skip the repository for the rest of the pass
    Decline,
    /// Undecided; later matches of the repository are still shown
    Defer,
    /// Stop previewing the current query
    Abort,
}

impl PreviewOutcome {
    /// Map a decision key (`y`, `n`, `m`, `q`, case-insensitive).
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'y' => Some(Self::Accept),
            'n' => Some(Self::Decline),
            'm' => Some(Self::Defer),
            'q' => Some(Self::Abort),
            _ => None,
        }
    }
}
