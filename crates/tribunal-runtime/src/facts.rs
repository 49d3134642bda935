//! Structural fact derivation.
//!
//! Facts are mechanical checks over the frozen evidence, computed before
//! any judge speaks. They exist so a confident-sounding bench cannot talk
//! its way past a missing structure: the chief justice caps any
//! criterion whose fact signal is unsatisfied.

use tribunal_core::{EvidenceRecord, FactSignal, FactSignals, FrozenEvidence, Rubric};

/// Concepts a structure-focused criterion must have positive evidence for.
const STRUCTURE_CONCEPTS: &[&str] = &["graph", "reducer"];

const UNSAFE_MARKER: &str = "unsafe execution detected";

/// Derive per-criterion fact signals from the frozen evidence.
///
/// Criteria are matched by ID keywords: structure criteria (`graph`,
/// `architecture`) require positive evidence for every structural
/// concept; security criteria (`security`, `forensic`) fail when any
/// positive record flags unsafe execution. Other criteria carry no
/// signal and synthesize from opinions alone.
pub fn derive_fact_signals(rubric: &Rubric, evidence: &FrozenEvidence) -> FactSignals {
    let mut signals = FactSignals::new();

    for criterion in &rubric.criteria {
        let id = criterion.id.to_ascii_lowercase();
        let signal = if id.contains("graph") || id.contains("architecture") {
            Some(structure_signal(evidence))
        } else if id.contains("security") || id.contains("forensic") {
            Some(security_signal(evidence))
        } else {
            None
        };

        if let Some(signal) = signal {
            if !signal.satisfied {
                tracing::info!(
                    criterion = %criterion.id,
                    detail = %signal.detail,
                    "structural fact unsatisfied"
                );
            }
            signals.insert(criterion.id.clone(), signal);
        }
    }

    signals
}

fn structure_signal(evidence: &FrozenEvidence) -> FactSignal {
    for concept in STRUCTURE_CONCEPTS {
        if !has_positive_mention(evidence, concept) {
            return FactSignal::missing(format!("no {concept} evidence found"));
        }
    }
    FactSignal::satisfied("all structural concepts verified in evidence")
}

fn security_signal(evidence: &FrozenEvidence) -> FactSignal {
    match evidence
        .iter()
        .find(|record| record.confidence > 0.0 && record.claim.contains(UNSAFE_MARKER))
    {
        Some(record) => FactSignal::unsafe_execution(format!(
            "unsafe execution evidence at {}",
            record.locator
        )),
        None => FactSignal::satisfied("no unsafe execution evidence"),
    }
}

fn has_positive_mention(evidence: &FrozenEvidence, concept: &str) -> bool {
    evidence.iter().any(|record: &EvidenceRecord| {
        record.confidence > 0.0 && record.claim.to_ascii_lowercase().contains(concept)
    })
}
