// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::GithubConfig;

/// Media type requested from the REST API.
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Create a configured asynchronous HTTP client.
///
/// Every request carries the token and the REST media type.
pub fn create_async_client(config: &GithubConfig) -> Result<reqwest::Client> {
    let mut auth = HeaderValue::from_str(&format!("token {}", config.token.trim()))
        .map_err(|_| AppError::config("github.token contains characters not allowed in a header"))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Shorten a response body for log lines and error messages.
pub fn snippet(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(max_chars).collect();
        format!("{head}…")
    }
}
