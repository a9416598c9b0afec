//! The ledger of captured repositories (`records.txt`).
//!
//! The set of ledger keys, rendered as `<owner>_<repository>`, must always
//! equal the set of capture directories under the collection root. The check
//! runs on every load; a mismatch is fatal and never repaired automatically.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{LedgerEntry, RepoKey};
use crate::storage::{append_line, capture_dirs, read_lines_optional};

/// Ledger file name under the collection root.
pub const LEDGER_FILE: &str = "records.txt";

/// First line of the ledger file.
pub const LEDGER_HEADER: &str = "owner,repository,repository_url,download_timestamp";

/// Durable record of captured repositories.
#[derive(Debug)]
pub struct Ledger {
    root: PathBuf,
    path: PathBuf,
    entries: Vec<LedgerEntry>,
    index: HashMap<RepoKey, usize>,
}

impl Ledger {
    /// Load the ledger under `root` and verify it against the filesystem.
    ///
    /// Without a ledger file the root must not contain any capture
    /// directory; a fresh ledger holding only the header is then written.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let path = root.join(LEDGER_FILE);
        let mut ledger = Self {
            root,
            path,
            entries: Vec::new(),
            index: HashMap::new(),
        };

        match read_lines_optional(&ledger.path)? {
            Some(lines) if !lines.is_empty() => {
                ledger.parse(&lines)?;
                ledger.verify()?;
                log::info!(
                    "Loaded ledger {} with {} entries",
                    ledger.path.display(),
                    ledger.len()
                );
            }
            _ => {
                ledger.verify()?;
                fs::write(&ledger.path, format!("{LEDGER_HEADER}\n"))?;
                log::info!("Created empty ledger {}", ledger.path.display());
            }
        }

        Ok(ledger)
    }

    fn parse(&mut self, lines: &[String]) -> Result<()> {
        let header = lines[0].trim_end();
        if header != LEDGER_HEADER {
            return Err(AppError::ledger_format(
                1,
                format!("expected header '{LEDGER_HEADER}', found '{header}'"),
            ));
        }

        for (offset, line) in lines.iter().enumerate().skip(1) {
            let line_no = offset + 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let entry = LedgerEntry::from_csv_line(line)
                .ok_or_else(|| AppError::ledger_format(line_no, "expected four fields"))?;
            if self.index.contains_key(&entry.key) {
                return Err(AppError::ledger_format(
                    line_no,
                    format!("duplicate entry for {}", entry.key),
                ));
            }
            self.insert(entry);
        }
        Ok(())
    }

    fn insert(&mut self, entry: LedgerEntry) {
        self.index.insert(entry.key.clone(), self.entries.len());
        self.entries.push(entry);
    }

    /// Compare ledger keys with the capture directories on disk.
    pub fn verify(&self) -> Result<()> {
        let expected: BTreeSet<String> = self.entries.iter().map(|e| e.key.dir_name()).collect();
        let actual = capture_dirs(&self.root)?;

        if expected == actual {
            return Ok(());
        }

        let missing_dirs: Vec<String> = expected.difference(&actual).cloned().collect();
        let untracked_dirs: Vec<String> = actual.difference(&expected).cloned().collect();
        log::error!(
            "Ledger consistency check failed for {}: missing {:?}, untracked {:?}",
            self.root.display(),
            missing_dirs,
            untracked_dirs
        );
        Err(AppError::Consistency {
            missing_dirs,
            untracked_dirs,
        })
    }

    /// Whether the repository has been captured.
    pub fn contains(&self, key: &RepoKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &RepoKey) -> Option<&LedgerEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Record a capture. The capture directory must already exist.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<()> {
        if !entry.is_serializable() {
            return Err(AppError::validation(format!(
                "ledger fields for {} contain a separator or line break",
                entry.key
            )));
        }
        if self.contains(&entry.key) {
            return Err(AppError::validation(format!(
                "{} is already in the ledger",
                entry.key
            )));
        }

        let dir_name = entry.key.dir_name();
        if !self.root.join(&dir_name).is_dir() {
            return Err(AppError::Consistency {
                missing_dirs: vec![dir_name],
                untracked_dirs: Vec::new(),
            });
        }

        append_line(&self.path, &entry.to_csv_line())?;
        log::debug!("Ledger append: {}", entry.to_csv_line());
        self.insert(entry);
        Ok(())
    }

    /// Entries in file order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collection root this ledger describes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Capture directory for a repository.
    pub fn capture_dir(&self, key: &RepoKey) -> PathBuf {
        self.root.join(key.dir_name())
    }
}
