//! # tribunal-core
//!
//! Deterministic evidence merging and verdict synthesis for Tribunal
//! audits.
//!
//! This crate is the pure half of the engine:
//! - the shared audit state and its lane-merge rules,
//! - the rubric describing what gets scored,
//! - the chief-justice synthesis that turns judge opinions into one
//!   explainable report.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: synthesizing the same opinion set always produces
//!    a byte-identical report.
//! 2. **No I/O, no LLM calls**: all network and filesystem work lives in
//!    `tribunal-runtime`.
//! 3. **Fact supremacy**: structural verification caps subjective judge
//!    scores; the override is always visible in the verdict.
//! 4. **Loss-free merging**: lane evidence is never dropped or
//!    overwritten; duplicate or malformed deliveries are rejected whole.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tribunal_core::{AuditState, ChiefJustice, Lane, Rubric};
//!
//! let mut state = AuditState::new();
//! state.merge(Lane::Repo, repo_records)?;
//! state.merge(Lane::Doc, doc_records)?;
//! let frozen = state.freeze();
//!
//! let rubric = Rubric::from_file("rubric.yaml")?;
//! let report = ChiefJustice::new().deliberate(&rubric, &opinions, &facts);
//! ```

pub mod evidence;
pub mod render;
pub mod rubric;
pub mod state;
pub mod synthesis;
pub mod types;

// Re-export main types at crate root
pub use evidence::{clip, EvidenceRecord, LaneRecorder, MAX_EXCERPT_LEN};
pub use render::render_markdown;
pub use rubric::{Criterion, Rubric, RubricError};
pub use state::{AuditState, FrozenEvidence, MergeError};
pub use synthesis::{ChiefJustice, DEFAULT_DISSENT_THRESHOLD, JUSTIFICATION_CLIP};
pub use types::{
    AuditReport, CriterionVerdict, FactSignal, FactSignals, JudgeRole, Lane, Opinion, ParseStatus,
};
