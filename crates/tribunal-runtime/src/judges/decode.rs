//! Strict decoding of judge responses.
//!
//! Judges return free text that should contain one JSON object matching
//! the opinion wire format. Decoding is validate-or-fail: a response that
//! does not survive schema validation becomes a fallback opinion, never a
//! best-effort parse.

use lazy_static::lazy_static;
use serde::Deserialize;
use thiserror::Error;
use tribunal_core::{JudgeRole, Opinion, ParseStatus};

/// Score assigned by the conservative fallback opinion.
pub const FALLBACK_SCORE: u8 = 2;

/// Errors from decoding a judge response.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response failed schema validation: {0}")]
    SchemaViolation(String),

    #[error("response names judge '{got}', expected '{expected}'")]
    RoleMismatch { expected: String, got: String },

    #[error("response names criterion '{got}', expected '{expected}'")]
    CriterionMismatch { expected: String, got: String },
}

const OPINION_SCHEMA: &str = r#"{
    "type": "object",
    "required": ["judge", "criterion_id", "score", "argument"],
    "properties": {
        "judge": {"type": "string"},
        "criterion_id": {"type": "string"},
        "score": {"type": "integer", "minimum": 1, "maximum": 5},
        "argument": {"type": "string"},
        "cited_evidence": {
            "type": "array",
            "items": {"type": "string"}
        }
    }
}"#;

lazy_static! {
    static ref OPINION_VALIDATOR: jsonschema::Validator = {
        let schema = serde_json::from_str(OPINION_SCHEMA).expect("Invalid opinion schema JSON");
        jsonschema::validator_for(&schema).expect("Invalid opinion schema")
    };
}

/// Wire format of a judge response, mirroring the prompt contract.
#[derive(Debug, Deserialize)]
struct WireOpinion {
    judge: String,
    criterion_id: String,
    score: u8,
    argument: String,
    #[serde(default)]
    cited_evidence: Vec<String>,
}

/// Decode a raw judge response into an `Opinion` with `parse_status = Ok`.
///
/// The response must contain one JSON object, pass schema validation, and
/// name the expected role and criterion. Citation IDs are normalized
/// (stray brackets and whitespace stripped, duplicates removed); their
/// existence in the evidence state is the chain's concern, not decoding's.
pub fn decode_opinion(
    raw: &str,
    role: JudgeRole,
    criterion_id: &str,
) -> Result<Opinion, DecodeError> {
    let json_str = extract_json(raw).ok_or(DecodeError::NoJsonObject)?;
    let value: serde_json::Value = serde_json::from_str(json_str)?;

    if let Some(error) = OPINION_VALIDATOR.iter_errors(&value).next() {
        return Err(DecodeError::SchemaViolation(error.to_string()));
    }

    let wire: WireOpinion = serde_json::from_value(value)?;

    if !wire.judge.eq_ignore_ascii_case(role.as_str()) {
        return Err(DecodeError::RoleMismatch {
            expected: role.as_str().to_string(),
            got: wire.judge,
        });
    }
    if wire.criterion_id != criterion_id {
        return Err(DecodeError::CriterionMismatch {
            expected: criterion_id.to_string(),
            got: wire.criterion_id,
        });
    }

    Ok(Opinion {
        criterion_id: wire.criterion_id,
        judge_role: role,
        score: wire.score,
        justification: wire.argument,
        cited_evidence_ids: normalize_citations(wire.cited_evidence),
        parse_status: ParseStatus::Ok,
    })
}

/// The conservative default opinion used when a judge step fails.
pub fn fallback_opinion(role: JudgeRole, criterion_id: &str, reason: &str) -> Opinion {
    Opinion {
        criterion_id: criterion_id.to_string(),
        judge_role: role,
        score: FALLBACK_SCORE,
        justification: format!("Safe fallback applied: {reason}"),
        cited_evidence_ids: Vec::new(),
        parse_status: ParseStatus::Fallback,
    }
}

/// Extract the first JSON object from text, tolerating prose around it.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Strip stray brackets/whitespace from citation IDs and drop duplicates,
/// preserving first-seen order.
fn normalize_citations(raw: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for item in raw {
        let cleaned: String = item
            .chars()
            .filter(|c| *c != '[' && *c != ']')
            .collect::<String>()
            .trim()
            .to_string();
        if !cleaned.is_empty() && seen.insert(cleaned.clone()) {
            out.push(cleaned);
        }
    }
    out
}
