//! File-backed state under the collection root.
//!
//! ## Directory Structure
//!
//! ```text
//! {output_root}/
//! ├── records.txt           # Ledger: one captured repository per line (CSV)
//! ├── queries.txt           # Every query ever issued, one per line
//! ├── harvest.log           # Append-only log file
//! ├── .tmp/                 # Archive downloads in flight
//! ├── alice_hw1/            # Capture directory for alice/hw1
//! └── bob_hw2/
//! ```
//!
//! Hidden directories (leading `.`) are not capture directories.

pub mod ledger;
pub mod queries;

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::{AppError, Result};

// Re-export for convenience
pub use ledger::{LEDGER_FILE, LEDGER_HEADER, Ledger};
pub use queries::{QUERIES_FILE, QueryHistory};

/// Read a text file line by line, returning None if it doesn't exist.
fn read_lines_optional(path: &Path) -> Result<Option<Vec<String>>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text.lines().map(str::to_string).collect())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Append one line and flush it to disk.
fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    file.sync_data()?;
    Ok(())
}

/// Names of the capture directories directly under `root`.
pub fn capture_dirs(root: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.insert(name);
        }
    }
    Ok(names)
}
