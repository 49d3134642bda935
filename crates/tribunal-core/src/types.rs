//! Shared data model for Tribunal audits.
//!
//! Everything here is serde-serializable: the final report artifact is a
//! straight JSON projection of these types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named evidence-producing channel.
///
/// The lane string is part of every evidence ID (`repo:0`, `doc:3`), which
/// is what makes cross-lane merging a union of disjoint keyspaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// Repository inspection (source checkout).
    Repo,
    /// Document inspection (written report).
    Doc,
    /// Image/diagram inspection.
    Vision,
}

impl Lane {
    /// Stable string form used as the evidence ID prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Repo => "repo",
            Lane::Doc => "doc",
            Lane::Vision => "vision",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The differently-biased judicial personas.
///
/// Chain order is fixed: prosecutor argues first, defense answers, the
/// tech lead rules last with both prior opinions in hand. The enum order
/// doubles as the deterministic tie-break index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeRole {
    /// Skeptical and strict; assumes corners were cut.
    Prosecutor,
    /// Fair and generous; credits partial implementations.
    Defense,
    /// Practical and engineering-focused.
    TechLead,
}

impl JudgeRole {
    /// Fixed evaluation order of the chain.
    pub const CHAIN: [JudgeRole; 3] = [JudgeRole::Prosecutor, JudgeRole::Defense, JudgeRole::TechLead];

    /// Position in the chain; lowest index wins ties.
    pub fn index(&self) -> usize {
        match self {
            JudgeRole::Prosecutor => 0,
            JudgeRole::Defense => 1,
            JudgeRole::TechLead => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JudgeRole::Prosecutor => "Prosecutor",
            JudgeRole::Defense => "Defense",
            JudgeRole::TechLead => "TechLead",
        }
    }
}

impl fmt::Display for JudgeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an opinion came from a successfully parsed judge response or
/// from the conservative fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Ok,
    Fallback,
}

/// One judge's scored, justified, evidence-citing verdict for one
/// rubric criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
    pub criterion_id: String,
    pub judge_role: JudgeRole,
    /// 1 = fails/no evidence .. 5 = exemplary.
    pub score: u8,
    pub justification: String,
    /// Evidence IDs (`lane:seq`) the justification rests on. Ordered,
    /// duplicates removed at decode time.
    pub cited_evidence_ids: Vec<String>,
    pub parse_status: ParseStatus,
}

impl Opinion {
    /// True if this opinion came out of the fallback path.
    pub fn is_fallback(&self) -> bool {
        self.parse_status == ParseStatus::Fallback
    }
}

/// Caller-supplied structural verification result for one criterion.
///
/// Facts outrank opinions: an unsatisfied signal caps the criterion score
/// regardless of how generously the judges scored it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSignal {
    /// Whether the required structural signal was found.
    pub satisfied: bool,
    /// Short human-readable description of what was (or was not) found.
    pub detail: String,
    /// True when the signal indicates an unsafe execution pattern;
    /// surfaces in the report's key risks.
    pub unsafe_execution: bool,
}

impl FactSignal {
    /// A satisfied signal; no override, no risk.
    pub fn satisfied(detail: impl Into<String>) -> Self {
        Self {
            satisfied: true,
            detail: detail.into(),
            unsafe_execution: false,
        }
    }

    /// A missing structural signal; caps the criterion at 2.
    pub fn missing(detail: impl Into<String>) -> Self {
        Self {
            satisfied: false,
            detail: detail.into(),
            unsafe_execution: false,
        }
    }

    /// An unsafe-execution finding; caps the criterion and raises a key risk.
    pub fn unsafe_execution(detail: impl Into<String>) -> Self {
        Self {
            satisfied: false,
            detail: detail.into(),
            unsafe_execution: true,
        }
    }
}

/// Per-criterion fact signals, keyed by criterion ID. Criteria without an
/// entry are treated as satisfied.
pub type FactSignals = BTreeMap<String, FactSignal>;

/// The synthesized outcome for one rubric criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionVerdict {
    pub criterion_id: String,
    /// Final score in [1,5] after rounding and any fact override.
    pub final_score: u8,
    /// Mean of the judge scores (0.0 when no opinions were produced).
    pub avg: f64,
    /// Population variance of the judge scores.
    pub variance: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub remediation: Vec<String>,
    /// True when the judges disagreed beyond the variance threshold.
    pub dissent: bool,
    /// True when structural verification forced the score down.
    pub fact_override_applied: bool,
}

/// The final audit artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub overall_score: u8,
    pub executive_summary: String,
    pub criteria: Vec<CriterionVerdict>,
    pub key_risks: Vec<String>,
}
