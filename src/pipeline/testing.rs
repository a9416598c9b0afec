//! In-memory code host and scripted operator for pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use tokio::time::Instant;
use zip::write::SimpleFileOptions;

use crate::error::{AppError, Result};
use crate::models::{CandidateMatch, RepoKey};
use crate::services::{
    CodeHost, FileContent, IssueOutcome, SearchItem, SearchOwner, SearchPage, SearchRepository,
};
use crate::utils::terminal::{Input, Key};

/// Build a search page from `(owner, repository, path)` triples.
pub fn search_page(total_count: Option<u64>, hits: &[(String, String, String)]) -> SearchPage {
    let items = hits
        .iter()
        .map(|(owner, repo, path)| SearchItem {
            path: path.clone(),
            html_url: None,
            repository: SearchRepository {
                name: repo.clone(),
                html_url: format!("https://x/{owner}/{repo}"),
                owner: SearchOwner {
                    login: owner.clone(),
                },
            },
        })
        .collect();
    SearchPage {
        total_count,
        items: Some(items),
        message: None,
    }
}

/// Zip archive holding the given `(name, contents)` files.
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in files {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Scriptable [`CodeHost`].
///
/// Files without registered content preview as a single line, and
/// repositories without a registered archive download a one-file zip.
pub struct FakeHost {
    pages: Vec<SearchPage>,
    contents: HashMap<String, FileContent>,
    archives: HashMap<RepoKey, Vec<u8>>,
    issue_outcome: IssueOutcome,
    search_calls: Mutex<Vec<(u32, Instant)>>,
    content_calls: Mutex<Vec<String>>,
    issue_calls: Mutex<Vec<RepoKey>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            contents: HashMap::new(),
            archives: HashMap::new(),
            issue_outcome: IssueOutcome::Created { url: None },
            search_calls: Mutex::new(Vec::new()),
            content_calls: Mutex::new(Vec::new()),
            issue_calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeHost {
    pub fn with_pages(mut self, pages: Vec<SearchPage>) -> Self {
        self.pages = pages;
        self
    }

    /// Single page holding the given hits.
    pub fn with_hits(self, hits: &[(&str, &str, &str)]) -> Self {
        let hits: Vec<_> = hits
            .iter()
            .map(|(o, r, p)| (o.to_string(), r.to_string(), p.to_string()))
            .collect();
        self.with_pages(vec![search_page(Some(hits.len() as u64), &hits)])
    }

    pub fn with_text(mut self, location: &str, text: &str) -> Self {
        self.contents.insert(
            location.to_string(),
            FileContent {
                encoding: Some("base64".into()),
                content: Some(BASE64_STANDARD.encode(text)),
            },
        );
        self
    }

    pub fn with_content(mut self, location: &str, content: FileContent) -> Self {
        self.contents.insert(location.to_string(), content);
        self
    }

    pub fn with_archive(mut self, key: RepoKey, bytes: Vec<u8>) -> Self {
        self.archives.insert(key, bytes);
        self
    }

    pub fn with_issue_outcome(mut self, outcome: IssueOutcome) -> Self {
        self.issue_outcome = outcome;
        self
    }

    pub fn search_calls(&self) -> Vec<(u32, Instant)> {
        self.search_calls.lock().unwrap().clone()
    }

    /// Locations whose content was fetched, in order.
    pub fn content_calls(&self) -> Vec<String> {
        self.content_calls.lock().unwrap().clone()
    }

    pub fn issue_calls(&self) -> Vec<RepoKey> {
        self.issue_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeHost for FakeHost {
    async fn search_code(
        &self,
        _query: &str,
        _language: &str,
        page: u32,
        _per_page: usize,
    ) -> Result<SearchPage> {
        self.search_calls.lock().unwrap().push((page, Instant::now()));
        Ok(self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_else(|| search_page(None, &[])))
    }

    async fn file_content(&self, candidate: &CandidateMatch) -> Result<FileContent> {
        let location = candidate.location();
        self.content_calls.lock().unwrap().push(location.clone());
        Ok(self.contents.get(&location).cloned().unwrap_or_else(|| FileContent {
            encoding: Some("base64".into()),
            content: Some(BASE64_STANDARD.encode(format!("// {location}\n"))),
        }))
    }

    async fn download_archive(&self, key: &RepoKey) -> Result<Vec<u8>> {
        match self.archives.get(key) {
            Some(bytes) => Ok(bytes.clone()),
            None => {
                let name = format!("{}-{}-abc123/main.cpp", key.owner, key.repository);
                Ok(zip_bytes(&[(name.as_str(), "int main() {}\n")]))
            }
        }
    }

    async fn create_issue(&self, key: &RepoKey, _title: &str, _body: &str) -> Result<IssueOutcome> {
        self.issue_calls.lock().unwrap().push(key.clone());
        Ok(self.issue_outcome.clone())
    }
}

/// Code host whose every call fails, for error-path tests.
pub struct FailingHost;

#[async_trait]
impl CodeHost for FailingHost {
    async fn search_code(&self, _: &str, _: &str, _: u32, _: usize) -> Result<SearchPage> {
        Err(AppError::Remote {
            status: 500,
            message: "down".into(),
        })
    }

    async fn file_content(&self, _: &CandidateMatch) -> Result<FileContent> {
        Err(AppError::Remote {
            status: 500,
            message: "down".into(),
        })
    }

    async fn download_archive(&self, _: &RepoKey) -> Result<Vec<u8>> {
        Err(AppError::Remote {
            status: 500,
            message: "down".into(),
        })
    }

    async fn create_issue(&self, _: &RepoKey, _: &str, _: &str) -> Result<IssueOutcome> {
        Err(AppError::Remote {
            status: 500,
            message: "down".into(),
        })
    }
}

/// Operator replaying a fixed script. Input is closed once it runs out.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    keys: VecDeque<Key>,
    lines: VecDeque<String>,
}

impl ScriptedInput {
    /// Every character of `keys` becomes one key press.
    pub fn new(keys: &str, lines: &[&str]) -> Self {
        Self {
            keys: keys.chars().map(Key::Char).collect(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn remaining_keys(&self) -> usize {
        self.keys.len()
    }
}

impl Input for ScriptedInput {
    fn read_key(&mut self) -> Result<Key> {
        Ok(self.keys.pop_front().unwrap_or(Key::Closed))
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}
