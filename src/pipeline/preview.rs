// src/pipeline/preview.rs

//! Scrolling preview of a matched file and the decision it ends in.

use std::io::Write;

use crossterm::style::Stylize;
use regex::{Regex, RegexBuilder};

use crate::error::{AppError, Result};
use crate::models::{CandidateMatch, PreviewOutcome};
use crate::services::CodeHost;
use crate::utils::terminal::{Input, Key};

const DECISION_HINT: &str = "[y]es / [n]o / [m]aybe / [q]uit";

/// Display settings, computed once per session.
#[derive(Debug, Clone, Copy)]
pub struct PreviewSettings {
    /// Terminal height in rows
    pub viewport_height: usize,
}

impl PreviewSettings {
    /// Lines shown before the operator is asked anything.
    pub fn free_lines(&self) -> usize {
        self.viewport_height / 2
    }
}

/// Shows one candidate at a time and collects the operator's decision.
pub struct PreviewEngine<'a, H: CodeHost + ?Sized> {
    host: &'a H,
    settings: PreviewSettings,
}

impl<'a, H: CodeHost + ?Sized> PreviewEngine<'a, H> {
    pub fn new(host: &'a H, settings: PreviewSettings) -> Self {
        Self { host, settings }
    }

    /// Fetch and display the candidate's matched file, then decide.
    ///
    /// Any failure to obtain readable text is reported as
    /// [`AppError::Preview`], which only concerns this candidate.
    pub async fn preview(
        &self,
        candidate: &CandidateMatch,
        query: &str,
        position: (usize, usize),
        input: &mut dyn Input,
        out: &mut dyn Write,
    ) -> Result<PreviewOutcome> {
        let location = candidate.location();
        let content = self
            .host
            .file_content(candidate)
            .await
            .map_err(|e| match e {
                AppError::Preview { .. } => e,
                other => AppError::preview(&location, other),
            })?;
        let text = content.decode_text(&location)?;

        let (index, total) = position;
        writeln!(out)?;
        writeln!(
            out,
            "{}",
            format!("── ({index}/{total}) {location} ──").bold()
        )?;
        if let Some(url) = &candidate.html_url {
            writeln!(out, "{url}")?;
        }

        decide(&text, query, self.settings.free_lines(), input, out)
    }
}

/// Case-insensitive literal matcher; `None` for an empty query.
fn query_matcher(query: &str) -> Option<Regex> {
    if query.trim().is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Stream `text` line by line and run the decision state machine.
///
/// The first `free_lines` lines are printed unconditionally. After every
/// later line one key is read; decision keys end the preview, any other key
/// shows the next line. Once the text is exhausted a decision is mandatory.
/// Closed input counts as [`PreviewOutcome::Abort`].
pub fn decide(
    text: &str,
    query: &str,
    free_lines: usize,
    input: &mut dyn Input,
    out: &mut dyn Write,
) -> Result<PreviewOutcome> {
    let matcher = query_matcher(query);

    for (index, line) in text.lines().enumerate() {
        match &matcher {
            Some(re) if re.is_match(line) => writeln!(out, "{}", line.bold().yellow())?,
            _ => writeln!(out, "{line}")?,
        }

        if index < free_lines {
            continue;
        }
        if index == free_lines {
            writeln!(out, "{}", format!("-- {DECISION_HINT}, any other key for more --").dim())?;
        }
        out.flush()?;

        match input.read_key()? {
            Key::Char(c) => {
                if let Some(outcome) = PreviewOutcome::from_key(c) {
                    return Ok(outcome);
                }
            }
            Key::Other => {}
            Key::Closed => return Ok(PreviewOutcome::Abort),
        }
    }

    loop {
        write!(out, "-- end of file -- Is match? {DECISION_HINT}: ")?;
        out.flush()?;

        match input.read_key()? {
            Key::Char(c) => {
                if let Some(outcome) = PreviewOutcome::from_key(c) {
                    writeln!(out)?;
                    return Ok(outcome);
                }
            }
            Key::Other => {}
            Key::Closed => {
                writeln!(out)?;
                return Ok(PreviewOutcome::Abort);
            }
        }
        writeln!(out)?;
        writeln!(out, "Invalid choice - try again")?;
    }
}
