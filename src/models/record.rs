//! Ledger record structure.

use chrono::Local;

use crate::models::{CandidateMatch, RepoKey};

/// Timestamp format used for new ledger records.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// A permanently captured repository, one line of `records.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub key: RepoKey,

    /// Web URL of the repository
    pub repository_url: String,

    /// Capture time, persisted verbatim
    pub timestamp: String,
}

impl LedgerEntry {
    pub fn new(key: RepoKey, repository_url: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            key,
            repository_url: repository_url.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Build an entry for a candidate captured right now.
    pub fn captured_now(candidate: &CandidateMatch) -> Self {
        Self::new(
            candidate.key.clone(),
            candidate.repository_url.clone(),
            Local::now().format(TIMESTAMP_FORMAT).to_string(),
        )
    }

    /// Serialize as a CSV line (without the trailing newline).
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{}",
            self.key.owner, self.key.repository, self.repository_url, self.timestamp
        )
    }

    /// Parse a CSV line. Returns `None` unless there are exactly four fields.
    pub fn from_csv_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').collect();
        match fields.as_slice() {
            [owner, repository, url, timestamp] if !owner.is_empty() && !repository.is_empty() => {
                Some(Self::new(RepoKey::new(*owner, *repository), *url, *timestamp))
            }
            _ => None,
        }
    }

    /// Fields must not contain the separator or line breaks.
    pub fn is_serializable(&self) -> bool {
        [
            self.key.owner.as_str(),
            self.key.repository.as_str(),
            self.repository_url.as_str(),
            self.timestamp.as_str(),
        ]
        .iter()
        .all(|field| !field.contains([',', '\n', '\r']))
    }
}
