//! Repository identity and search-hit structures.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Identity of a repository on the code host.
///
/// Everything keyed by repository (the ledger, the declined set, collection
/// filtering) goes through this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoKey {
    pub owner: String,
    pub repository: String,
}

impl RepoKey {
    pub fn new(owner: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
        }
    }

    /// Name of the capture directory: `<owner>_<repository>`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.owner, self.repository)
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repository)
    }
}

/// One code-search hit.
///
/// Equality and hashing only look at the owning repository, so two hits at
/// different paths of the same repository are the same candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub key: RepoKey,

    /// Path of the matched file inside the repository
    pub path: String,

    /// Web URL of the repository
    pub repository_url: String,

    /// Web URL of the matched file, when the API supplied one
    #[serde(default)]
    pub html_url: Option<String>,
}

impl CandidateMatch {
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        path: impl Into<String>,
        repository_url: impl Into<String>,
    ) -> Self {
        Self {
            key: RepoKey::new(owner, repository),
            path: path.into(),
            repository_url: repository_url.into(),
            html_url: None,
        }
    }

    pub fn owner(&self) -> &str {
        &self.key.owner
    }

    pub fn repository(&self) -> &str {
        &self.key.repository
    }

    /// `owner/repository/path`, used in log lines and error contexts.
    pub fn location(&self) -> String {
        format!("{}/{}", self.key, self.path)
    }
}

impl PartialEq for CandidateMatch {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CandidateMatch {}

impl Hash for CandidateMatch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
