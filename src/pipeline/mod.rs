//! Session pipeline, leaf-first.
//!
//! - `collect`: paginated search into a candidate list
//! - `preview`: per-candidate display and decision
//! - `commit`: capture of an accepted repository
//! - `session`: query loop tying the stages together

pub mod collect;
pub mod commit;
pub mod preview;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use collect::{CollectSettings, Collected, ResultCollector, estimate_eta};
pub use commit::{CommitPipeline, CommitReport, CommitSettings};
pub use preview::{PreviewEngine, PreviewSettings, decide};
pub use session::{PassSummary, Session, SessionSettings, SessionSummary, confirm};
