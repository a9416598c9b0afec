// src/pipeline/session.rs

//! Interactive session: query prompt, per-query passes, summary.

use std::collections::HashSet;
use std::io::Write;

use crate::error::Result;
use crate::hooks::Hooks;
use crate::models::{CandidateMatch, Config, PreviewOutcome, RepoKey};
use crate::pipeline::collect::{CollectSettings, ResultCollector};
use crate::pipeline::commit::{CommitPipeline, CommitSettings};
use crate::pipeline::preview::{PreviewEngine, PreviewSettings};
use crate::services::CodeHost;
use crate::storage::{Ledger, QueryHistory};
use crate::utils::log;
use crate::utils::terminal::{Input, Key};

/// Everything a session needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub language: String,
    pub collect: CollectSettings,
    pub preview: PreviewSettings,
    pub commit: CommitSettings,
    /// Ask before previewing this many candidates or more
    pub confirm_threshold: usize,
}

impl SessionSettings {
    /// Build settings from the loaded config and the terminal height.
    pub fn from_config(config: &Config, viewport_height: usize) -> Self {
        Self {
            language: config.collection.language.clone(),
            collect: CollectSettings::from(&config.collection),
            preview: PreviewSettings { viewport_height },
            commit: CommitSettings::from(config),
            confirm_threshold: config.collection.confirm_threshold,
        }
    }
}

/// Counters for one processed query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub query: String,
    /// Candidates left after dropping captured repositories
    pub candidates: usize,
    pub previewed: usize,
    pub captured: Vec<RepoKey>,
    pub declined: usize,
    pub deferred: usize,
    /// Candidates skipped because their repository was decided earlier in the pass
    pub skipped: usize,
    pub preview_failures: usize,
    /// The operator quit the pass, or refused to preview a large result
    pub aborted: bool,
}

/// Totals for the whole session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub passes: Vec<PassSummary>,
}

impl SessionSummary {
    /// Repositories captured during this session, in capture order.
    pub fn captured(&self) -> impl Iterator<Item = &RepoKey> {
        self.passes.iter().flat_map(|p| p.captured.iter())
    }

    pub fn captured_count(&self) -> usize {
        self.passes.iter().map(|p| p.captured.len()).sum()
    }
}

/// One operator session over a collection root.
pub struct Session<H: CodeHost> {
    host: H,
    ledger: Ledger,
    history: QueryHistory,
    hooks: Hooks,
    settings: SessionSettings,
}

impl<H: CodeHost> Session<H> {
    pub fn new(
        host: H,
        ledger: Ledger,
        history: QueryHistory,
        hooks: Hooks,
        settings: SessionSettings,
    ) -> Self {
        Self {
            host,
            ledger,
            history,
            hooks,
            settings,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    /// Prompt for queries until the operator stops.
    ///
    /// The session ends on an empty query, end of input, or a "no" to
    /// "Continue querying?". Errors other than per-candidate preview
    /// failures end the session and are returned.
    pub async fn run(&mut self, input: &mut dyn Input, out: &mut dyn Write) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();
        log::header(&format!(
            "Session started ({} repositories already captured)",
            self.ledger.len()
        ));

        loop {
            write!(out, "Query? ")?;
            out.flush()?;
            let Some(line) = input.read_line()? else {
                writeln!(out)?;
                break;
            };
            let query = line.trim();
            if query.is_empty() {
                break;
            }

            let pass = self.run_query(query, input, out).await?;
            summary.passes.push(pass);

            if !confirm(input, out, "Continue querying?")? {
                break;
            }
        }

        let captured: Vec<String> = summary.captured().map(ToString::to_string).collect();
        log::summary(
            "Session",
            &[
                ("Queries", summary.passes.len().to_string()),
                ("Captured", summary.captured_count().to_string()),
                ("Ledger size", self.ledger.len().to_string()),
            ],
        );
        for key in &captured {
            log::sub_item(key);
        }
        Ok(summary)
    }

    /// Record, collect and review one query.
    pub async fn run_query(
        &mut self,
        query: &str,
        input: &mut dyn Input,
        out: &mut dyn Write,
    ) -> Result<PassSummary> {
        if !self.history.record(query)? {
            ::log::debug!("Query '{query}' was issued before");
        }

        let collected = ResultCollector::new(&self.host, &self.settings.collect)
            .collect(query, &self.settings.language, &self.ledger)
            .await?;
        let candidates = collected.candidates;

        if candidates.len() >= self.settings.confirm_threshold && !candidates.is_empty() {
            let prompt = format!("{} candidates to preview. Proceed?", candidates.len());
            if !confirm(input, out, &prompt)? {
                log::info(&format!("Skipped previews for '{query}'"));
                return Ok(PassSummary {
                    query: query.to_string(),
                    candidates: candidates.len(),
                    aborted: true,
                    ..PassSummary::default()
                });
            }
        }

        self.process_candidates(query, &candidates, input, out).await
    }

    /// Preview each candidate and act on the decision.
    ///
    /// A candidate is skipped when its repository entered the ledger or was
    /// declined earlier in this pass. Deferred repositories stay eligible.
    pub async fn process_candidates(
        &mut self,
        query: &str,
        candidates: &[CandidateMatch],
        input: &mut dyn Input,
        out: &mut dyn Write,
    ) -> Result<PassSummary> {
        let mut pass = PassSummary {
            query: query.to_string(),
            candidates: candidates.len(),
            ..PassSummary::default()
        };
        let mut declined: HashSet<RepoKey> = HashSet::new();
        let total = candidates.len();
        let engine = PreviewEngine::new(&self.host, self.settings.preview);

        for (i, candidate) in candidates.iter().enumerate() {
            if self.ledger.contains(&candidate.key) || declined.contains(&candidate.key) {
                pass.skipped += 1;
                continue;
            }

            log::info(&format!("Previewing file {}/{total}: {}", i + 1, candidate.location()));
            let outcome = match engine.preview(candidate, query, (i + 1, total), input, out).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_pass_recoverable() => {
                    log::warn(&e.to_string());
                    pass.preview_failures += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            pass.previewed += 1;

            match outcome {
                PreviewOutcome::Accept => {
                    let pipeline =
                        CommitPipeline::new(&self.host, &self.hooks, &self.settings.commit);
                    let report = pipeline.commit(candidate, query, &mut self.ledger).await?;
                    pass.captured.push(report.entry.key);
                }
                PreviewOutcome::Decline => {
                    ::log::debug!("Declined {} for this pass", candidate.key);
                    declined.insert(candidate.key.clone());
                    pass.declined += 1;
                }
                PreviewOutcome::Defer => {
                    pass.deferred += 1;
                }
                PreviewOutcome::Abort => {
                    log::info(&format!("Stopped reviewing '{query}' at {}/{total}", i + 1));
                    pass.aborted = true;
                    break;
                }
            }
        }

        log::summary(
            &format!("Query '{query}'"),
            &[
                ("Candidates", pass.candidates.to_string()),
                ("Previewed", pass.previewed.to_string()),
                ("Captured", pass.captured.len().to_string()),
                ("Declined", pass.declined.to_string()),
                ("Deferred", pass.deferred.to_string()),
                ("Skipped", pass.skipped.to_string()),
                ("Preview failures", pass.preview_failures.to_string()),
            ],
        );
        Ok(pass)
    }
}

/// Ask a y/n question until the operator answers. Closed input is "no".
pub fn confirm(input: &mut dyn Input, out: &mut dyn Write, prompt: &str) -> Result<bool> {
    loop {
        write!(out, "{prompt} (y/n) ")?;
        out.flush()?;
        let key = input.read_key()?;
        writeln!(out)?;
        match key {
            Key::Char('y' | 'Y') => return Ok(true),
            Key::Char('n' | 'N') | Key::Closed => return Ok(false),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::LedgerEntry;
    use crate::pipeline::testing::{FakeHost, ScriptedInput};
    use crate::services::FileContent;
    use crate::storage::{LEDGER_FILE, QUERIES_FILE};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings() -> SessionSettings {
        SessionSettings {
            language: "cpp".into(),
            collect: CollectSettings {
                page_size: 30,
                delay: Duration::ZERO,
                max_pages: 34,
            },
            // no free lines: one key decides each single-line preview
            preview: PreviewSettings { viewport_height: 0 },
            commit: CommitSettings::default(),
            confirm_threshold: 100,
        }
    }

    fn session(root: &Path, host: FakeHost) -> Session<FakeHost> {
        Session::new(
            host,
            Ledger::load(root).unwrap(),
            QueryHistory::load(root).unwrap(),
            Hooks::default(),
            settings(),
        )
    }

    fn keys(pass: &PassSummary) -> Vec<String> {
        pass.captured.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn accepted_candidate_is_captured_and_recorded() {
        let tmp = TempDir::new().unwrap();
        let host = FakeHost::default().with_hits(&[("alice", "hw1", "main.cpp")]);
        let mut session = session(tmp.path(), host);
        let mut input = ScriptedInput::new("y", &[]);
        let mut out = Vec::new();

        let pass = session.run_query("main", &mut input, &mut out).await.unwrap();

        assert_eq!(keys(&pass), vec!["alice/hw1"]);
        assert!(tmp.path().join("alice_hw1").is_dir());
        let text = fs::read_to_string(tmp.path().join(LEDGER_FILE)).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "owner,repository,repository_url,download_timestamp");
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("alice,hw1,https://x/alice/hw1,"));
        assert!(Ledger::load(tmp.path()).is_ok());
    }

    #[tokio::test]
    async fn decline_suppresses_rest_of_repository() {
        let tmp = TempDir::new().unwrap();
        let host = FakeHost::default().with_hits(&[
            ("alice", "hw1", "a.cpp"),
            ("alice", "hw1", "b.cpp"),
            ("bob", "hw2", "c.cpp"),
        ]);
        let mut session = session(tmp.path(), host);
        let mut input = ScriptedInput::new("nn", &[]);
        let mut out = Vec::new();

        let pass = session.run_query("sort", &mut input, &mut out).await.unwrap();

        assert_eq!(pass.previewed, 2);
        assert_eq!(pass.skipped, 1);
        assert_eq!(
            session.host().content_calls(),
            vec!["alice/hw1/a.cpp", "bob/hw2/c.cpp"]
        );
        assert!(session.ledger().is_empty());
    }

    #[tokio::test]
    async fn defer_keeps_repository_eligible() {
        let tmp = TempDir::new().unwrap();
        let host = FakeHost::default()
            .with_hits(&[("alice", "hw1", "a.cpp"), ("alice", "hw1", "b.cpp")]);
        let mut session = session(tmp.path(), host);
        let mut input = ScriptedInput::new("my", &[]);
        let mut out = Vec::new();

        let pass = session.run_query("sort", &mut input, &mut out).await.unwrap();

        assert_eq!(pass.deferred, 1);
        assert_eq!(keys(&pass), vec!["alice/hw1"]);
        assert_eq!(session.host().content_calls().len(), 2);
    }

    #[tokio::test]
    async fn accepted_repository_is_not_previewed_again() {
        let tmp = TempDir::new().unwrap();
        let host = FakeHost::default()
            .with_hits(&[("alice", "hw1", "a.cpp"), ("alice", "hw1", "b.cpp")]);
        let mut session = session(tmp.path(), host);
        let mut input = ScriptedInput::new("y", &[]);
        let mut out = Vec::new();

        let pass = session.run_query("sort", &mut input, &mut out).await.unwrap();

        assert_eq!(pass.skipped, 1);
        assert_eq!(session.host().content_calls(), vec!["alice/hw1/a.cpp"]);
    }

    #[tokio::test]
    async fn abort_ends_only_the_current_pass() {
        let tmp = TempDir::new().unwrap();
        let host = FakeHost::default().with_hits(&[
            ("r1", "hw", "main.cpp"),
            ("r2", "hw", "main.cpp"),
            ("r3", "hw", "main.cpp"),
            ("r4", "hw", "main.cpp"),
            ("r5", "hw", "main.cpp"),
        ]);
        let mut session = session(tmp.path(), host);
        let mut input = ScriptedInput::new("yyq", &[]);
        let mut out = Vec::new();

        let pass = session.run_query("sort", &mut input, &mut out).await.unwrap();

        assert!(pass.aborted);
        assert_eq!(keys(&pass), vec!["r1/hw", "r2/hw"]);
        assert_eq!(session.ledger().len(), 2);
        assert_eq!(session.host().content_calls().len(), 3);
        assert!(session.ledger().verify().is_ok());
    }

    #[tokio::test]
    async fn preview_failure_skips_only_that_candidate() {
        let tmp = TempDir::new().unwrap();
        let host = FakeHost::default()
            .with_hits(&[("alice", "hw1", "a.bin"), ("bob", "hw2", "b.cpp")])
            .with_content(
                "alice/hw1/a.bin",
                FileContent {
                    encoding: Some("utf-16".into()),
                    content: Some("??".into()),
                },
            );
        let mut session = session(tmp.path(), host);
        let mut input = ScriptedInput::new("y", &[]);
        let mut out = Vec::new();

        let pass = session.run_query("sort", &mut input, &mut out).await.unwrap();

        assert_eq!(pass.preview_failures, 1);
        assert_eq!(keys(&pass), vec!["bob/hw2"]);
    }

    #[tokio::test]
    async fn large_results_need_confirmation() {
        let tmp = TempDir::new().unwrap();
        let host = FakeHost::default()
            .with_hits(&[("alice", "hw1", "a.cpp"), ("bob", "hw2", "b.cpp")]);
        let mut session = session(tmp.path(), host);
        session.settings.confirm_threshold = 2;
        let mut input = ScriptedInput::new("n", &[]);
        let mut out = Vec::new();

        let pass = session.run_query("sort", &mut input, &mut out).await.unwrap();

        assert!(pass.aborted);
        assert_eq!(pass.candidates, 2);
        assert_eq!(pass.previewed, 0);
        assert!(session.host().content_calls().is_empty());
        assert!(String::from_utf8(out).unwrap().contains("2 candidates to preview"));
    }

    #[tokio::test]
    async fn collection_skips_repositories_from_earlier_sessions() {
        let tmp = TempDir::new().unwrap();
        {
            let mut ledger = Ledger::load(tmp.path()).unwrap();
            fs::create_dir(tmp.path().join("alice_hw1")).unwrap();
            ledger
                .append(LedgerEntry::new(
                    RepoKey::new("alice", "hw1"),
                    "https://x/alice/hw1",
                    "2024/01/01 00:00:00",
                ))
                .unwrap();
        }
        let host = FakeHost::default()
            .with_hits(&[("alice", "hw1", "a.cpp"), ("bob", "hw2", "b.cpp")]);
        let mut session = session(tmp.path(), host);
        let mut input = ScriptedInput::new("n", &[]);
        let mut out = Vec::new();

        let pass = session.run_query("sort", &mut input, &mut out).await.unwrap();

        assert_eq!(pass.candidates, 1);
        assert_eq!(session.host().content_calls(), vec!["bob/hw2/b.cpp"]);
    }

    #[tokio::test]
    async fn run_loops_until_operator_stops() {
        let tmp = TempDir::new().unwrap();
        let host = FakeHost::default().with_hits(&[("alice", "hw1", "main.cpp")]);
        let mut session = session(tmp.path(), host);
        // decline, continue, decline again (declines are per pass), input closes
        let mut input = ScriptedInput::new("nyn", &["sort", "sort"]);
        let mut out = Vec::new();

        let summary = session.run(&mut input, &mut out).await.unwrap();

        assert_eq!(summary.passes.len(), 2);
        assert_eq!(summary.passes[1].previewed, 1);
        assert_eq!(summary.captured_count(), 0);
        assert_eq!(session.history().len(), 1);
        let queries = fs::read_to_string(tmp.path().join(QUERIES_FILE)).unwrap();
        assert_eq!(queries.lines().collect::<Vec<_>>(), vec!["sort"]);
    }

    #[tokio::test]
    async fn empty_query_ends_session() {
        let tmp = TempDir::new().unwrap();
        let mut session = session(tmp.path(), FakeHost::default());
        let mut input = ScriptedInput::new("", &["   "]);
        let mut out = Vec::new();

        let summary = session.run(&mut input, &mut out).await.unwrap();

        assert!(summary.passes.is_empty());
        assert!(session.history().is_empty());
        assert!(session.host().search_calls().is_empty());
    }

    #[tokio::test]
    async fn rate_limit_ends_session_with_error() {
        let tmp = TempDir::new().unwrap();
        let host = FakeHost::default().with_pages(vec![crate::services::SearchPage {
            message: Some("API rate limit exceeded".into()),
            ..Default::default()
        }]);
        let mut session = session(tmp.path(), host);
        let mut input = ScriptedInput::new("", &["sort"]);
        let mut out = Vec::new();

        let err = session.run(&mut input, &mut out).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimit { .. }));
        assert!(session.history().contains("sort"));
    }

    #[test]
    fn confirm_repeats_until_answer() {
        let mut input = ScriptedInput::new("x Y", &[]);
        let mut out = Vec::new();
        assert!(confirm(&mut input, &mut out, "Continue querying?").unwrap());
        assert_eq!(String::from_utf8(out).unwrap().matches("(y/n)").count(), 3);

        let mut closed = ScriptedInput::new("", &[]);
        assert!(!confirm(&mut closed, &mut Vec::new(), "Continue querying?").unwrap());
    }
}
