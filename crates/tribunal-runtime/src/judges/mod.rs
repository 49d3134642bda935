//! The LLM-judge boundary and the evaluator chain built on top of it.
//!
//! The core never talks to a model provider directly: everything goes
//! through [`JudgeClient`], which takes a fully-assembled request and
//! returns raw text to be decoded against the opinion schema.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tribunal_core::{Criterion, EvidenceRecord, FrozenEvidence, JudgeRole, Opinion};

mod chain;
mod decode;
mod heuristic;

pub use chain::EvaluatorChain;
pub use decode::{decode_opinion, fallback_opinion, DecodeError, FALLBACK_SCORE};
pub use heuristic::HeuristicJudge;

/// Errors from judge clients.
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Authentication failed")]
    Auth,

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl JudgeError {
    /// Whether the retry policy should attempt this call again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            JudgeError::RateLimited { .. } | JudgeError::Transient(_) | JudgeError::Timeout(_)
        )
    }
}

/// One fully-assembled judging request.
///
/// Prior opinions for the same criterion are included so later roles can
/// answer earlier ones (debate-style), not judge in isolation.
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    pub role: JudgeRole,
    pub criterion: Criterion,
    /// Compact text summary of the relevant evidence.
    pub evidence_brief: String,
    /// Evidence IDs present in the brief, in preferred citation order.
    pub evidence_ids: Vec<String>,
    pub prior_opinions: Vec<Opinion>,
}

/// Boundary to whatever produces judge opinions.
///
/// Implementations return raw text; decoding and validation happen on
/// this side of the boundary, never inside the client.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Produce a raw response for one (role, criterion) step.
    async fn evaluate(&self, request: &JudgeRequest) -> Result<String, JudgeError>;

    /// Client name for logs.
    fn name(&self) -> &str;
}

/// Build the compact evidence summary a judge sees.
///
/// One line per record: `- <id> | FOUND/FAIL | <claim> | <locator> | <confidence>`.
pub fn evidence_brief(evidence: &FrozenEvidence, max_items: usize) -> String {
    let lines: Vec<String> = evidence
        .iter()
        .take(max_items)
        .map(|record| {
            let status = if record.confidence > 0.0 { "FOUND" } else { "FAIL" };
            format!(
                "- {} | {} | {} | {} | {:.2}",
                record.id, status, record.claim, record.locator, record.confidence
            )
        })
        .collect();

    if lines.is_empty() {
        "No evidence provided.".to_string()
    } else {
        lines.join("\n")
    }
}

/// Evidence IDs in preferred citation order: failures first (highest
/// confidence first), then positive findings by confidence.
pub fn preferred_citations(evidence: &FrozenEvidence, limit: usize) -> Vec<String> {
    let mut negatives: Vec<&EvidenceRecord> =
        evidence.iter().filter(|r| r.confidence < 0.5).collect();
    let mut positives: Vec<&EvidenceRecord> =
        evidence.iter().filter(|r| r.confidence >= 0.5).collect();

    // Stable sort keeps lane/emission order among equal confidences.
    negatives.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    positives.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    negatives
        .into_iter()
        .chain(positives)
        .take(limit)
        .map(|r| r.id.clone())
        .collect()
}
