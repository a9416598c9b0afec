//! Application configuration structures.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Remote API access
    #[serde(default)]
    pub github: GithubConfig,

    /// Search and capture behavior
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Issue raised on captured repositories
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Auxiliary directory and enrichment hook arguments
    #[serde(default)]
    pub auxiliary: AuxiliaryConfig,

    /// Files removed from every capture
    #[serde(default)]
    pub filter: FilterConfig,

    /// Log file settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Unknown keys are rejected. The result is not validated; call
    /// [`Config::validate`] before use.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate required settings and value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.github.token.trim().is_empty() {
            return Err(AppError::config("github.token is required"));
        }
        if self.github.user_agent.trim().is_empty() {
            return Err(AppError::config("github.user_agent is empty"));
        }
        if self.github.timeout_secs == 0 {
            return Err(AppError::config("github.timeout_secs must be > 0"));
        }
        if self.collection.language.trim().is_empty() {
            return Err(AppError::config("collection.language is required"));
        }
        if self.collection.output_root.as_os_str().is_empty() {
            return Err(AppError::config("collection.output_root is required"));
        }
        if !(1..=100).contains(&self.collection.page_size) {
            return Err(AppError::config("collection.page_size must be within 1..=100"));
        }
        if self.collection.max_pages == 0 {
            return Err(AppError::config("collection.max_pages must be > 0"));
        }
        if self.notify.raise_issue && self.notify.issue_title.trim().is_empty() {
            return Err(AppError::config(
                "notify.issue_title is required when notify.raise_issue is enabled",
            ));
        }

        // Nothing else may create a visible directory under the collection
        // root; it would count as a capture directory on the next load.
        let output_root = normalize(&self.collection.output_root)?;
        if let Some(root) = &self.auxiliary.root {
            let root = normalize(root)?;
            if root == output_root || visible_subdir(&output_root, &root).is_some() {
                return Err(AppError::config(
                    "auxiliary.root must not be the collection root or a visible directory inside it",
                ));
            }
        }
        let log_path = normalize(&self.log_path())?;
        if let Some(dir) = log_path.parent().and_then(|p| visible_subdir(&output_root, p)) {
            return Err(AppError::config(format!(
                "logging.file would create directory '{dir}' in the collection root; \
                 keep the log directly in it, in a hidden directory, or outside it"
            )));
        }
        Ok(())
    }

    /// Path of the log file; relative paths live under the collection root.
    pub fn log_path(&self) -> PathBuf {
        if self.logging.file.is_absolute() {
            self.logging.file.clone()
        } else {
            self.collection.output_root.join(&self.logging.file)
        }
    }

    /// Human-readable settings listing with the token masked.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let auxiliary = self
            .auxiliary
            .root
            .as_ref()
            .map_or_else(|| "(none)".to_string(), |p| p.display().to_string());
        vec![
            ("github.token", mask_token(&self.github.token)),
            ("github.api_base_url", self.github.api_base_url.clone()),
            ("collection.language", self.collection.language.clone()),
            (
                "collection.output_root",
                self.collection.output_root.display().to_string(),
            ),
            (
                "collection.request_delay_ms",
                self.collection.request_delay_ms.to_string(),
            ),
            ("notify.raise_issue", self.notify.raise_issue.to_string()),
            ("auxiliary.root", auxiliary),
            ("logging.file", self.log_path().display().to_string()),
        ]
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
fn normalize(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .map_err(|e| AppError::config(format!("invalid path '{}': {e}", path.display())))?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// First directory below `root` on the way to `dir`, unless it is hidden.
fn visible_subdir(root: &Path, dir: &Path) -> Option<String> {
    let first = dir.strip_prefix(root).ok()?.components().next()?;
    let name = first.as_os_str().to_string_lossy();
    (!name.starts_with('.')).then(|| name.into_owned())
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

/// Remote API access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GithubConfig {
    /// Personal access token
    #[serde(default)]
    pub token: String,

    /// REST API root
    #[serde(default = "defaults::api_base_url")]
    pub api_base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base_url: defaults::api_base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Search and capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    /// Language qualifier for code search
    #[serde(default)]
    pub language: String,

    /// Collection root holding the ledger and capture directories
    #[serde(default)]
    pub output_root: PathBuf,

    /// Results per search page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Delay between search pages in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Upper bound on pages fetched for one query
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Ask before previewing this many candidates or more
    #[serde(default = "defaults::confirm_threshold")]
    pub confirm_threshold: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            language: String::new(),
            output_root: PathBuf::new(),
            page_size: defaults::page_size(),
            request_delay_ms: defaults::request_delay(),
            max_pages: defaults::max_pages(),
            confirm_threshold: defaults::confirm_threshold(),
        }
    }
}

/// Issue notification settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    #[serde(default)]
    pub raise_issue: bool,
    #[serde(default)]
    pub issue_title: String,
    #[serde(default)]
    pub issue_body: String,
}

/// Auxiliary directory settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuxiliaryConfig {
    /// Root under which an empty directory is created per capture
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Extra arguments handed to the enrichment hook
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// Built-in file filter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// File extensions (without the dot) removed from captures
    #[serde(default)]
    pub remove_extensions: Vec<String>,

    /// Directory names whose contents are removed from captures
    #[serde(default)]
    pub remove_dirs: Vec<String>,
}

/// Log file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level written to the log file
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Log file path; relative paths are resolved against the collection root
    #[serde(default = "defaults::log_file")]
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            file: defaults::log_file(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn api_base_url() -> String {
        "https://api.github.com".into()
    }
    pub fn user_agent() -> String {
        concat!("gh-harvest/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        60
    }

    // Code search serves 30 results per page unless told otherwise
    pub fn page_size() -> usize {
        30
    }
    pub fn request_delay() -> u64 {
        6000
    }
    // Code search never returns more than 1000 results
    pub fn max_pages() -> u32 {
        34
    }
    pub fn confirm_threshold() -> usize {
        100
    }

    pub fn log_level() -> String {
        "debug".into()
    }
    pub fn log_file() -> PathBuf {
        PathBuf::from("harvest.log")
    }
}
