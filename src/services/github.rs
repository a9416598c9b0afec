// src/services/github.rs

//! GitHub REST API client.
//!
//! Only the fields the harvester consumes are modelled. Everything the
//! session needs from the code host goes through the [`CodeHost`] trait so
//! the pipeline can run against a fake in tests.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CandidateMatch, GithubConfig, RepoKey};
use crate::utils::http::{create_async_client, snippet};

/// One page of code-search results.
///
/// `items` is absent when the API refused the search (quota, abuse
/// detection, validation failure); `message` then carries its explanation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub items: Option<Vec<SearchItem>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A code-search hit as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItem {
    pub path: String,
    #[serde(default)]
    pub html_url: Option<String>,
    pub repository: SearchRepository,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRepository {
    pub name: String,
    pub html_url: String,
    pub owner: SearchOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOwner {
    pub login: String,
}

impl From<SearchItem> for CandidateMatch {
    fn from(item: SearchItem) -> Self {
        let mut candidate = CandidateMatch::new(
            item.repository.owner.login,
            item.repository.name,
            item.path,
            item.repository.html_url,
        );
        candidate.html_url = item.html_url;
        candidate
    }
}

/// Encoded file body from the contents endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileContent {
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl FileContent {
    /// Decode to text. Only base64-transported UTF-8 is supported.
    pub fn decode_text(&self, context: &str) -> Result<String> {
        match self.encoding.as_deref() {
            Some("base64") => {}
            Some(other) => {
                return Err(AppError::preview(
                    context,
                    format!("unsupported content encoding '{other}'"),
                ));
            }
            None => return Err(AppError::preview(context, "response carries no encoded content")),
        }

        let encoded: String = self
            .content
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = BASE64_STANDARD
            .decode(encoded)
            .map_err(|e| AppError::preview(context, format!("invalid base64: {e}")))?;
        String::from_utf8(bytes).map_err(|_| AppError::preview(context, "content is not UTF-8 text"))
    }
}

/// Result of raising an issue on a captured repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    Created { url: Option<String> },
    /// The repository has issues turned off
    Disabled,
    Failed { status: u16, message: String },
}

/// Remote operations the harvester relies on.
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// Fetch one page of code-search results.
    async fn search_code(
        &self,
        query: &str,
        language: &str,
        page: u32,
        per_page: usize,
    ) -> Result<SearchPage>;

    /// Fetch the matched file of a candidate.
    async fn file_content(&self, candidate: &CandidateMatch) -> Result<FileContent>;

    /// Download the default branch of a repository as a zip archive.
    async fn download_archive(&self, key: &RepoKey) -> Result<Vec<u8>>;

    /// Open an issue on a repository.
    async fn create_issue(&self, key: &RepoKey, title: &str, body: &str) -> Result<IssueOutcome>;
}

/// [`CodeHost`] backed by the GitHub REST API.
pub struct GithubClient {
    client: Client,
    base_url: Url,
}

impl GithubClient {
    /// Create a client for the configured API root.
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let client = create_async_client(config)?;
        let base_url = Url::parse(&config.api_base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "github.api_base_url '{}' cannot be used as a base URL",
                config.api_base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Build an endpoint URL from raw path segments, percent-encoding each.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl CodeHost for GithubClient {
    async fn search_code(
        &self,
        query: &str,
        language: &str,
        page: u32,
        per_page: usize,
    ) -> Result<SearchPage> {
        let url = self.endpoint(["search", "code"]);
        let q = format!("{query} in:file language:{language}");
        log::debug!("GET {url} q={q:?} page={page} per_page={per_page}");

        let response = self
            .client
            .get(url)
            .query(&[
                ("q", q),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        log::debug!("Search page {page} -> {status}: {}", snippet(&body, 500));

        match serde_json::from_str::<SearchPage>(&body) {
            Ok(page) => Ok(page),
            Err(e) if status.is_success() => Err(AppError::Json(e)),
            Err(_) => Ok(SearchPage {
                message: Some(format!("{status}: {}", snippet(&body, 200))),
                ..SearchPage::default()
            }),
        }
    }

    async fn file_content(&self, candidate: &CandidateMatch) -> Result<FileContent> {
        let url = self.endpoint(
            ["repos", candidate.owner(), candidate.repository(), "contents"]
                .into_iter()
                .chain(candidate.path.split('/')),
        );
        log::debug!("GET {url}");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        log::debug!("Contents {} -> {status}", candidate.location());

        if !status.is_success() {
            return Err(AppError::preview(
                candidate.location(),
                format!("contents endpoint returned {status}: {}", snippet(&body, 200)),
            ));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn download_archive(&self, key: &RepoKey) -> Result<Vec<u8>> {
        let url = self.endpoint(["repos", &key.owner, &key.repository, "zipball"]);
        log::debug!("GET {url}");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote {
                status: status.as_u16(),
                message: snippet(&body, 200),
            });
        }

        let bytes = response.bytes().await?;
        log::debug!("Archive {key} -> {status}, {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn create_issue(&self, key: &RepoKey, title: &str, body: &str) -> Result<IssueOutcome> {
        let url = self.endpoint(["repos", &key.owner, &key.repository, "issues"]);
        log::debug!("POST {url}");

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "title": title, "body": body }))
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        log::debug!("Issue {key} -> {status}: {}", snippet(&text, 200));

        let outcome = match status {
            s if s.is_success() => {
                let url = serde_json::from_str::<serde_json::Value>(&text)
                    .ok()
                    .and_then(|v| v.get("html_url")?.as_str().map(str::to_string));
                IssueOutcome::Created { url }
            }
            StatusCode::GONE => IssueOutcome::Disabled,
            s => IssueOutcome::Failed {
                status: s.as_u16(),
                message: snippet(&text, 200),
            },
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GithubClient {
        let config = GithubConfig {
            token: "ghp_test".into(),
            api_base_url: server.uri(),
            ..GithubConfig::default()
        };
        GithubClient::new(&config).unwrap()
    }

    fn item(owner: &str, repo: &str, file: &str) -> serde_json::Value {
        json!({
            "path": file,
            "html_url": format!("https://github.com/{owner}/{repo}/blob/main/{file}"),
            "repository": {
                "name": repo,
                "html_url": format!("https://github.com/{owner}/{repo}"),
                "owner": { "login": owner }
            }
        })
    }

    #[tokio::test]
    async fn search_sends_qualified_query_and_parses_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/code"))
            .and(query_param("q", "quicksort in:file language:cpp"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "30"))
            .and(header("authorization", "token ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "items": [item("alice", "hw1", "src/main.cpp")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server)
            .search_code("quicksort", "cpp", 2, 30)
            .await
            .unwrap();

        assert_eq!(page.total_count, Some(1));
        let items = page.items.unwrap();
        let candidate = CandidateMatch::from(items[0].clone());
        assert_eq!(candidate.key, RepoKey::new("alice", "hw1"));
        assert_eq!(candidate.path, "src/main.cpp");
        assert_eq!(candidate.repository_url, "https://github.com/alice/hw1");
    }

    #[tokio::test]
    async fn search_quota_response_has_no_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/code"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "message": "API rate limit exceeded"
            })))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .search_code("quicksort", "cpp", 1, 30)
            .await
            .unwrap();
        assert!(page.items.is_none());
        assert_eq!(page.message.as_deref(), Some("API rate limit exceeded"));
    }

    #[tokio::test]
    async fn file_content_is_fetched_and_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/alice/hw1/contents/src/main.cpp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "encoding": "base64",
                "content": "aW50IG1haW4o\nKSB7fQo=\n"
            })))
            .mount(&server)
            .await;

        let candidate = CandidateMatch::new("alice", "hw1", "src/main.cpp", "u");
        let content = client_for(&server).file_content(&candidate).await.unwrap();
        assert_eq!(content.decode_text("ctx").unwrap(), "int main() {}\n");
    }

    #[tokio::test]
    async fn archive_download_propagates_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/alice/hw1/zipball"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/alice/gone/zipball"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let bytes = client.download_archive(&RepoKey::new("alice", "hw1")).await.unwrap();
        assert_eq!(bytes, b"PK\x03\x04");

        let err = client
            .download_archive(&RepoKey::new("alice", "gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Remote { status: 404, .. }));
    }

    #[tokio::test]
    async fn issue_statuses_map_to_outcomes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/alice/hw1/issues"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "html_url": "https://github.com/alice/hw1/issues/1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/bob/hw2/issues"))
            .respond_with(ResponseTemplate::new(410).set_body_json(json!({
                "message": "Issues are disabled for this repo"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/carol/hw3/issues"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(
            client
                .create_issue(&RepoKey::new("alice", "hw1"), "t", "b")
                .await
                .unwrap(),
            IssueOutcome::Created {
                url: Some("https://github.com/alice/hw1/issues/1".into())
            }
        );
        assert_eq!(
            client
                .create_issue(&RepoKey::new("bob", "hw2"), "t", "b")
                .await
                .unwrap(),
            IssueOutcome::Disabled
        );
        assert!(matches!(
            client
                .create_issue(&RepoKey::new("carol", "hw3"), "t", "b")
                .await
                .unwrap(),
            IssueOutcome::Failed { status: 403, .. }
        ));
    }

    #[test]
    fn decode_rejects_other_encodings_and_binary() {
        let content = FileContent {
            encoding: Some("none".into()),
            content: Some(String::new()),
        };
        assert!(matches!(
            content.decode_text("a/b/c"),
            Err(AppError::Preview { .. })
        ));

        // 0xff 0xfe is not valid UTF-8
        let content = FileContent {
            encoding: Some("base64".into()),
            content: Some("//4=".into()),
        };
        assert!(matches!(
            content.decode_text("a/b/c"),
            Err(AppError::Preview { .. })
        ));
    }
}
