//! Deterministic built-in judge.
//!
//! Scores from the evidence brief alone, with no model behind it. Used
//! when no provider is configured and as the stable baseline in tests:
//! the prosecutor reads failures harshly, the defense charitably, and
//! the tech lead averages the bench so far.

use async_trait::async_trait;
use tribunal_core::JudgeRole;

use crate::judges::{JudgeClient, JudgeError, JudgeRequest};

const NO_EVIDENCE: &str = "No evidence provided.";

/// Rule-based judge producing wire-format responses.
#[derive(Debug, Default)]
pub struct HeuristicJudge;

impl HeuristicJudge {
    pub fn new() -> Self {
        Self
    }

    fn score_for(request: &JudgeRequest) -> (u8, String) {
        let empty = request.evidence_brief.trim() == NO_EVIDENCE;
        let has_failure = request.evidence_brief.contains("| FAIL |");

        match request.role {
            JudgeRole::Prosecutor => {
                if empty {
                    (1, "No evidence was gathered; the claim is unsupported.".to_string())
                } else if has_failure {
                    (2, "The evidence includes explicit verification failures.".to_string())
                } else {
                    (3, "No failures found, but the evidence does not exceed its claims.".to_string())
                }
            }
            JudgeRole::Defense => {
                if empty {
                    (1, "Nothing to defend without evidence.".to_string())
                } else if has_failure {
                    (3, "Failures exist but the remaining evidence supports partial credit.".to_string())
                } else {
                    (4, "The gathered evidence consistently supports the claims.".to_string())
                }
            }
            JudgeRole::TechLead => {
                if empty {
                    (1, "No evidence; siding with the bench's skepticism.".to_string())
                } else if request.prior_opinions.is_empty() {
                    (3, "No prior arguments to weigh; scoring from evidence alone.".to_string())
                } else {
                    let sum: u32 = request.prior_opinions.iter().map(|o| u32::from(o.score)).sum();
                    let mean = f64::from(sum) / request.prior_opinions.len() as f64;
                    let score = ((mean + 0.5).floor() as u8).clamp(1, 5);
                    (score, "Balancing the prosecution and defense arguments.".to_string())
                }
            }
        }
    }
}

#[async_trait]
impl JudgeClient for HeuristicJudge {
    async fn evaluate(&self, request: &JudgeRequest) -> Result<String, JudgeError> {
        let (score, argument) = Self::score_for(request);
        let citations: Vec<&str> = request
            .evidence_ids
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();

        let body = serde_json::json!({
            "judge": request.role.as_str(),
            "criterion_id": request.criterion.id,
            "score": score,
            "argument": argument,
            "cited_evidence": citations,
        });
        Ok(body.to_string())
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}
