// src/pipeline/commit.rs

//! Capture of an accepted repository.
//!
//! Steps run in a fixed order: download, extract, filter, ledger append,
//! issue, auxiliary directory. The capture directory exists before the
//! ledger line is written, so the ledger never names a directory that is
//! not on disk. Everything after the ledger append is best-effort.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{AppError, Result};
use crate::hooks::{EnrichmentContext, Hooks};
use crate::models::{CandidateMatch, Config, LedgerEntry};
use crate::services::{CodeHost, IssueOutcome};
use crate::storage::Ledger;
use crate::utils::log;

/// Hidden download directory under the collection root.
const DOWNLOAD_DIR: &str = ".tmp";

/// Notification and auxiliary settings.
#[derive(Debug, Clone, Default)]
pub struct CommitSettings {
    pub raise_issue: bool,
    pub issue_title: String,
    pub issue_body: String,
    pub auxiliary_root: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl From<&Config> for CommitSettings {
    fn from(config: &Config) -> Self {
        Self {
            raise_issue: config.notify.raise_issue,
            issue_title: config.notify.issue_title.clone(),
            issue_body: config.notify.issue_body.clone(),
            auxiliary_root: config.auxiliary.root.clone(),
            extra_args: config.auxiliary.extra_args.clone(),
        }
    }
}

/// What a successful commit did.
#[derive(Debug)]
pub struct CommitReport {
    pub entry: LedgerEntry,
    pub capture_dir: PathBuf,
    /// Files deleted by the file filter
    pub removed_files: usize,
    /// Issue result, when issue raising is enabled
    pub notification: Option<IssueOutcome>,
    /// Auxiliary directory, when one was created
    pub auxiliary_dir: Option<PathBuf>,
}

/// Downloaded archive, removed when dropped.
struct TempArchive {
    path: PathBuf,
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                ::log::warn!("Could not remove {}: {e}", self.path.display());
            }
        }
    }
}

/// Runs the capture steps for accepted candidates.
pub struct CommitPipeline<'a, H: CodeHost + ?Sized> {
    host: &'a H,
    hooks: &'a Hooks,
    settings: &'a CommitSettings,
}

impl<'a, H: CodeHost + ?Sized> CommitPipeline<'a, H> {
    pub fn new(host: &'a H, hooks: &'a Hooks, settings: &'a CommitSettings) -> Self {
        Self {
            host,
            hooks,
            settings,
        }
    }

    /// Capture `candidate` and record it in `ledger`.
    pub async fn commit(
        &self,
        candidate: &CandidateMatch,
        query: &str,
        ledger: &mut Ledger,
    ) -> Result<CommitReport> {
        let key = &candidate.key;
        let capture_dir = ledger.capture_dir(key);
        if ledger.contains(key) {
            return Err(AppError::validation(format!("{key} is already captured")));
        }
        if capture_dir.exists() {
            return Err(AppError::Consistency {
                missing_dirs: Vec::new(),
                untracked_dirs: vec![key.dir_name()],
            });
        }

        // 1. download
        log::info(&format!("Downloading {key}"));
        let bytes = self.host.download_archive(key).await?;
        let download_dir = ledger.root().join(DOWNLOAD_DIR);
        fs::create_dir_all(&download_dir)?;
        let archive = TempArchive {
            path: download_dir.join(format!("{}.zip", key.dir_name())),
        };
        fs::write(&archive.path, &bytes)?;
        drop(bytes);

        // 2. extract
        let archive_path = archive.path.clone();
        let target = capture_dir.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_archive(&archive_path, &target))
            .await
            .map_err(|e| AppError::extraction(key.to_string(), e))
            .and_then(|result| result.map_err(|e| AppError::extraction(key.to_string(), e)));
        drop(archive);

        let file_count = match extracted {
            Ok(count) => count,
            Err(e) => {
                discard_capture(&capture_dir);
                log::error(&e.to_string());
                return Err(e);
            }
        };
        log::debug(&format!("Extracted {file_count} files into {}", capture_dir.display()));

        // 3. filter
        let removed_files = self.apply_file_filter(&capture_dir);

        // 4. ledger
        let entry = LedgerEntry::captured_now(candidate);
        // a capture directory without its ledger line would fail the next startup
        if let Err(e) = ledger.append(entry.clone()) {
            discard_capture(&capture_dir);
            log::error(&format!("Could not record {key}: {e}"));
            return Err(e);
        }
        log::success(&format!(
            "Captured {key} into {} ({} files, {removed_files} filtered)",
            capture_dir.display(),
            file_count - removed_files
        ));

        // 5. notification
        let notification = if self.settings.raise_issue {
            Some(self.raise_issue(candidate).await)
        } else {
            None
        };

        // 6. auxiliary directory
        let auxiliary_dir = self.prepare_auxiliary(candidate, &capture_dir, query);

        Ok(CommitReport {
            entry,
            capture_dir,
            removed_files,
            notification,
            auxiliary_dir,
        })
    }

    /// Delete every extracted file the filter selects. Never fails.
    fn apply_file_filter(&self, capture_dir: &Path) -> usize {
        let mut removed = 0;
        let files = WalkDir::new(capture_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file());

        for file in files {
            let relative = file.path().strip_prefix(capture_dir).unwrap_or(file.path());
            if !self.hooks.should_remove(relative) {
                continue;
            }
            match fs::remove_file(file.path()) {
                Ok(()) => {
                    removed += 1;
                    ::log::debug!("Filtered {}", file.path().display());
                }
                Err(e) => log::warn(&format!("Could not remove {}: {e}", file.path().display())),
            }
        }
        removed
    }

    async fn raise_issue(&self, candidate: &CandidateMatch) -> IssueOutcome {
        let key = &candidate.key;
        let outcome = match self
            .host
            .create_issue(key, &self.settings.issue_title, &self.settings.issue_body)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => IssueOutcome::Failed {
                status: 0,
                message: e.to_string(),
            },
        };

        match &outcome {
            IssueOutcome::Created { url } => log::info(&format!(
                "Raised issue on {key}{}",
                url.as_deref().map(|u| format!(": {u}")).unwrap_or_default()
            )),
            IssueOutcome::Disabled => log::warn(&format!("Issues are disabled on {key}")),
            IssueOutcome::Failed { status, message } => {
                log::warn(&format!("Could not raise issue on {key} ({status}): {message}"))
            }
        }
        outcome
    }

    /// Create the auxiliary directory and run the enrichment hook.
    fn prepare_auxiliary(
        &self,
        candidate: &CandidateMatch,
        capture_dir: &Path,
        query: &str,
    ) -> Option<PathBuf> {
        let root = self.settings.auxiliary_root.as_ref()?;
        let auxiliary_dir = root.join(candidate.key.dir_name());

        if let Err(e) = fs::create_dir_all(&auxiliary_dir) {
            log::warn(&format!(
                "Could not create auxiliary directory {}: {e}",
                auxiliary_dir.display()
            ));
            return None;
        }

        let context = EnrichmentContext {
            capture_dir,
            auxiliary_dir: &auxiliary_dir,
            query,
            extra_args: &self.settings.extra_args,
        };
        if let Err(e) = self.hooks.enrich(&context) {
            log::warn(&format!("Enrichment failed for {}: {e}", candidate.key));
        }
        Some(auxiliary_dir)
    }
}

/// Remove a capture directory that never made it into the ledger.
fn discard_capture(capture_dir: &Path) {
    if !capture_dir.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(capture_dir) {
        log::error(&format!(
            "Could not remove partial capture {}: {e}",
            capture_dir.display()
        ));
    }
}

/// Extract a zip archive into `target`, returning the number of files.
///
/// Entries whose names would escape `target` are skipped.
fn extract_archive(archive_path: &Path, target: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    fs::create_dir_all(target)?;

    let mut files = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            ::log::warn!("Skipping unsafe archive entry {}", entry.name());
            continue;
        };
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        files += 1;
    }
    Ok(files)
}
