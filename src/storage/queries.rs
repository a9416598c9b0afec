//! History of issued queries (`queries.txt`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::storage::{append_line, read_lines_optional};

/// Query history file name under the collection root.
pub const QUERIES_FILE: &str = "queries.txt";

/// Append-only, de-duplicated set of past queries.
#[derive(Debug)]
pub struct QueryHistory {
    path: PathBuf,
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl QueryHistory {
    /// Load past queries from `root`; a missing file is an empty history.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(QUERIES_FILE);
        let mut history = Self {
            path,
            ordered: Vec::new(),
            seen: HashSet::new(),
        };

        for line in read_lines_optional(&history.path)?.unwrap_or_default() {
            if history.seen.insert(line.clone()) {
                history.ordered.push(line);
            }
        }
        Ok(history)
    }

    /// Record a query. Returns `false` when it was already known.
    pub fn record(&mut self, query: &str) -> Result<bool> {
        if self.seen.contains(query) {
            return Ok(false);
        }
        append_line(&self.path, query)?;
        self.seen.insert(query.to_string());
        self.ordered.push(query.to_string());
        Ok(true)
    }

    pub fn contains(&self, query: &str) -> bool {
        self.seen.contains(query)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Queries in file order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}
