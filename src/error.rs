// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Zip archive could not be read
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Remote API answered with a non-success status
    #[error("Remote API returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// `records.txt` could not be parsed
    #[error("Malformed ledger at line {line}: {message}")]
    LedgerFormat { line: usize, message: String },

    /// Ledger and capture directories disagree
    #[error(
        "Ledger is out of sync with the collection root (missing directories: [{}], untracked directories: [{}]); reconcile manually",
        .missing_dirs.join(", "),
        .untracked_dirs.join(", ")
    )]
    Consistency {
        missing_dirs: Vec<String>,
        untracked_dirs: Vec<String>,
    },

    /// Search quota exhausted or abuse detection triggered
    #[error("Rate limit reached while searching for '{query}': {message}")]
    RateLimit { query: String, message: String },

    /// Archive extraction failed
    #[error(
        "Failed to extract {repository}: {message}. The repository may be too large for the archive endpoint; download it manually"
    )]
    Extraction { repository: String, message: String },

    /// A single candidate could not be previewed
    #[error("Preview failed for {context}: {message}")]
    Preview { context: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a ledger format error.
    pub fn ledger_format(line: usize, message: impl fmt::Display) -> Self {
        Self::LedgerFormat {
            line,
            message: message.to_string(),
        }
    }

    /// Create a rate limit error for a query.
    pub fn rate_limit(query: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::RateLimit {
            query: query.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction error for a repository.
    pub fn extraction(repository: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extraction {
            repository: repository.into(),
            message: message.to_string(),
        }
    }

    /// Create a preview error with context.
    pub fn preview(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Preview {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error only concerns one candidate, so the pass may go on.
    pub fn is_pass_recoverable(&self) -> bool {
        matches!(self, Self::Preview { .. })
    }
}
