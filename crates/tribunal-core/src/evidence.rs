//! Evidence records: the atomic, immutable facts analyzers produce.
//!
//! Every record carries a lane-scoped ID of the form `<lane>:<sequence>`
//! so records from different lanes can never collide.

use serde::{Deserialize, Serialize};

use crate::types::Lane;

/// Maximum excerpt length kept on a record. Longer excerpts are clipped
/// to keep judge prompts small.
pub const MAX_EXCERPT_LEN: usize = 240;

/// A single piece of evidence produced by one analyzer invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Lane-scoped stable ID, e.g. `repo:0`.
    pub id: String,
    pub lane: Lane,
    /// What this record asserts (or failed to find).
    pub claim: String,
    /// How well-supported the claim is, in [0,1].
    pub confidence: f64,
    /// Opaque locator: file path + line, document chunk, page number.
    pub locator: String,
    /// Short verbatim excerpt backing the claim.
    pub raw_excerpt: String,
}

impl EvidenceRecord {
    /// Create a record with an explicit sequence number within its lane.
    ///
    /// Confidence is clamped into [0,1] and the excerpt is clipped.
    pub fn new(
        lane: Lane,
        sequence: usize,
        claim: impl Into<String>,
        confidence: f64,
        locator: impl Into<String>,
        raw_excerpt: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{}:{}", lane.as_str(), sequence),
            lane,
            claim: claim.into(),
            confidence: confidence.clamp(0.0, 1.0),
            locator: locator.into(),
            raw_excerpt: clip(&raw_excerpt.into(), MAX_EXCERPT_LEN),
        }
    }

    /// A diagnostic record describing an analyzer failure.
    ///
    /// Failing lanes still report: downstream stages see a known lane with
    /// one zero-confidence record rather than a missing lane.
    pub fn diagnostic(lane: Lane, claim: impl Into<String>) -> Self {
        Self::new(lane, 0, claim, 0.0, "diagnostic", "")
    }

    /// Whether the record's ID carries its own lane prefix.
    pub fn id_matches_lane(&self) -> bool {
        self.id
            .strip_prefix(self.lane.as_str())
            .is_some_and(|rest| rest.starts_with(':'))
    }
}

/// Assigns sequential IDs while an analyzer accumulates records for its lane.
#[derive(Debug)]
pub struct LaneRecorder {
    lane: Lane,
    records: Vec<EvidenceRecord>,
}

impl LaneRecorder {
    pub fn new(lane: Lane) -> Self {
        Self {
            lane,
            records: Vec::new(),
        }
    }

    /// Append a record; the sequence number is the current record count.
    pub fn push(
        &mut self,
        claim: impl Into<String>,
        confidence: f64,
        locator: impl Into<String>,
        raw_excerpt: impl Into<String>,
    ) {
        let record = EvidenceRecord::new(
            self.lane,
            self.records.len(),
            claim,
            confidence,
            locator,
            raw_excerpt,
        );
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> Vec<EvidenceRecord> {
        self.records
    }
}

/// Normalize whitespace and truncate to `n` characters (with ellipsis).
pub fn clip(text: &str, n: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= n {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(n).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_are_lane_scoped() {
        let record = EvidenceRecord::new(Lane::Repo, 3, "fan-out found", 0.9, "src/graph.rs:40", "");
        assert_eq!(record.id, "repo:3");
        assert!(record.id_matches_lane());
    }

    #[test]
    fn confidence_is_clamped() {
        let record = EvidenceRecord::new(Lane::Doc, 0, "claim", 1.7, "p1", "");
        assert_eq!(record.confidence, 1.0);
        let record = EvidenceRecord::new(Lane::Doc, 0, "claim", -0.2, "p1", "");
        assert_eq!(record.confidence, 0.0);
    }

    #[test]
    fn excerpt_is_clipped_and_normalized() {
        let long = "word ".repeat(100);
        let record = EvidenceRecord::new(Lane::Doc, 0, "claim", 0.5, "p1", long);
        assert!(record.raw_excerpt.chars().count() <= MAX_EXCERPT_LEN + 3);
        assert!(record.raw_excerpt.ends_with("..."));
        assert!(!record.raw_excerpt.contains("  "));
    }

    #[test]
    fn diagnostic_record_has_zero_confidence() {
        let record = EvidenceRecord::diagnostic(Lane::Vision, "inspection timed out");
        assert_eq!(record.id, "vision:0");
        assert_eq!(record.confidence, 0.0);
    }

    #[test]
    fn recorder_assigns_sequences() {
        let mut recorder = LaneRecorder::new(Lane::Repo);
        recorder.push("first", 0.8, "a", "");
        recorder.push("second", 0.6, "b", "");
        let records = recorder.finish();
        assert_eq!(records[0].id, "repo:0");
        assert_eq!(records[1].id, "repo:1");
    }
}
