// src/pipeline/collect.rs

//! Paginated collection of code-search matches.

use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::{CandidateMatch, CollectionConfig};
use crate::services::CodeHost;
use crate::storage::Ledger;
use crate::utils::{format_duration, log};

/// Paging and pacing settings.
#[derive(Debug, Clone)]
pub struct CollectSettings {
    /// Items per page requested from the search endpoint
    pub page_size: usize,
    /// Pause before every page after the first
    pub delay: Duration,
    /// Stop after this many pages
    pub max_pages: u32,
}

impl From<&CollectionConfig> for CollectSettings {
    fn from(config: &CollectionConfig) -> Self {
        Self {
            page_size: config.page_size,
            delay: Duration::from_millis(config.request_delay_ms),
            max_pages: config.max_pages,
        }
    }
}

/// Outcome of collecting one query.
#[derive(Debug, Default)]
pub struct Collected {
    /// New candidates in arrival order
    pub candidates: Vec<CandidateMatch>,
    /// Items returned by the API, including those already captured
    pub raw_items: usize,
    /// Items dropped because their repository is already in the ledger
    pub known_items: usize,
    pub pages_fetched: u32,
    /// Total reported on the first page
    pub total_count: Option<u64>,
    /// Estimated time spent waiting between pages
    pub eta: Option<Duration>,
}

/// Wall-clock estimate for the remaining pages.
///
/// The first page is free; every further page costs one delay.
pub fn estimate_eta(total_count: u64, page_size: usize, delay: Duration) -> Duration {
    let page_size = page_size.max(1) as u64;
    let mut pages = total_count / page_size;
    if total_count % page_size == 0 {
        pages = pages.saturating_sub(1);
    }
    delay.saturating_mul(u32::try_from(pages).unwrap_or(u32::MAX))
}

/// Collects search matches page by page, skipping captured repositories.
pub struct ResultCollector<'a, H: CodeHost + ?Sized> {
    host: &'a H,
    settings: &'a CollectSettings,
}

impl<'a, H: CodeHost + ?Sized> ResultCollector<'a, H> {
    pub fn new(host: &'a H, settings: &'a CollectSettings) -> Self {
        Self { host, settings }
    }

    /// Fetch every page for `query`.
    ///
    /// A page without `items` means the API refused the search; the whole
    /// collection fails with [`AppError::RateLimit`] and is not retried.
    pub async fn collect(&self, query: &str, language: &str, known: &Ledger) -> Result<Collected> {
        let page_size = self.settings.page_size;
        let mut collected = Collected::default();
        let mut page = 1u32;

        log::info(&format!(
            "Collecting results for '{query}' (language: {language})"
        ));

        loop {
            if page > 1 && !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }

            let response = self
                .host
                .search_code(query, language, page, page_size)
                .await?;
            let Some(items) = response.items else {
                let message = response
                    .message
                    .unwrap_or_else(|| "search response carried no items".to_string());
                log::error(&format!("Search for '{query}' refused on page {page}: {message}"));
                return Err(AppError::rate_limit(query, message));
            };

            if page == 1 {
                collected.total_count = response.total_count;
                if let Some(total) = response.total_count {
                    let eta = estimate_eta(total, page_size, self.settings.delay);
                    collected.eta = Some(eta);
                    log::info(&format!(
                        "{total} matches reported; estimated collection time {}",
                        format_duration(eta)
                    ));
                }
            }

            let received = items.len();
            collected.raw_items += received;
            collected.pages_fetched += 1;

            for item in items {
                let candidate = CandidateMatch::from(item);
                if known.contains(&candidate.key) {
                    collected.known_items += 1;
                    continue;
                }
                collected.candidates.push(candidate);
            }
            ::log::debug!("Page {page}: {received} items, {} candidates so far", collected.candidates.len());

            if received < page_size {
                break;
            }
            if page >= self.settings.max_pages {
                log::warn(&format!(
                    "Stopping after {page} pages; refine the query to see further results"
                ));
                break;
            }
            page += 1;
        }

        log::info(&format!(
            "Collected {} candidates from {} items ({} already captured)",
            collected.candidates.len(),
            collected.raw_items,
            collected.known_items
        ));
        Ok(collected)
    }
}
