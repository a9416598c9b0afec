// src/hooks.rs

//! Operator-supplied callbacks run by the commit pipeline.
//!
//! The host program registers them once at startup; both have fixed
//! defaults (keep every file, no enrichment).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::models::FilterConfig;

/// Returns true for extracted paths that must be deleted.
pub type FileFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Post-capture work on the auxiliary directory.
pub type Enrichment = Arc<dyn Fn(&EnrichmentContext<'_>) -> Result<()> + Send + Sync>;

/// Arguments handed to the enrichment hook.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentContext<'a> {
    pub capture_dir: &'a Path,
    pub auxiliary_dir: &'a Path,
    pub query: &'a str,
    pub extra_args: &'a [String],
}

/// Registered callbacks.
#[derive(Clone)]
pub struct Hooks {
    file_filter: FileFilter,
    enrichment: Enrichment,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            file_filter: Arc::new(|_| false),
            enrichment: Arc::new(|_| Ok(())),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

impl Hooks {
    pub fn with_file_filter(mut self, filter: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        self.file_filter = Arc::new(filter);
        self
    }

    pub fn with_enrichment(
        mut self,
        enrichment: impl Fn(&EnrichmentContext<'_>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.enrichment = Arc::new(enrichment);
        self
    }

    pub fn should_remove(&self, path: &Path) -> bool {
        (self.file_filter)(path)
    }

    pub fn enrich(&self, context: &EnrichmentContext<'_>) -> Result<()> {
        (self.enrichment)(context)
    }
}

/// Build the file filter described by the `[filter]` config section.
///
/// Returns `None` when the section is empty so the default filter stays.
pub fn filter_from_config(config: &FilterConfig) -> Option<impl Fn(&Path) -> bool + Send + Sync + 'static> {
    if config.remove_extensions.is_empty() && config.remove_dirs.is_empty() {
        return None;
    }

    let extensions: Vec<String> = config
        .remove_extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    let dirs: Vec<PathBuf> = config.remove_dirs.iter().map(PathBuf::from).collect();

    Some(move |path: &Path| {
        let by_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        let by_dir = path
            .parent()
            .is_some_and(|parent| parent.components().any(|c| dirs.iter().any(|d| d.as_os_str() == c.as_os_str())));
        by_extension || by_dir
    })
}
