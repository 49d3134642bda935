//! The shared audit state: lane-partitioned evidence and its merge rules.
//!
//! The state lives behind a single critical section during the fan-out
//! phase and is frozen before any judge reads it. Lanes are disjoint
//! keyspaces (the lane is part of every record ID), so merging different
//! lanes commutes and never overwrites.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::evidence::EvidenceRecord;
use crate::types::Lane;

/// Errors from merging a lane's evidence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    /// The lane already reported in this run. Re-delivery is rejected and
    /// the state is left unchanged.
    #[error("lane '{0}' already merged in this run")]
    DuplicateLane(Lane),

    /// A record in the batch is inconsistent with its lane: wrong lane
    /// field, wrong ID prefix, or a duplicate ID within the batch.
    #[error("malformed evidence in lane '{lane}': {reason} (id '{id}')")]
    MalformedEvidence {
        lane: Lane,
        id: String,
        reason: String,
    },
}

/// Mutable accumulator for analyzer output. One writer per lane, exactly
/// one merge per lane, then [`AuditState::freeze`].
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuditState {
    lanes: BTreeMap<Lane, Vec<EvidenceRecord>>,
}

impl AuditState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one lane's complete output into the state.
    ///
    /// Validation happens before any mutation, so a rejected merge leaves
    /// the state byte-identical to what it was.
    pub fn merge(&mut self, lane: Lane, records: Vec<EvidenceRecord>) -> Result<(), MergeError> {
        if self.lanes.contains_key(&lane) {
            return Err(MergeError::DuplicateLane(lane));
        }

        let mut seen = BTreeSet::new();
        for record in &records {
            if record.lane != lane {
                return Err(MergeError::MalformedEvidence {
                    lane,
                    id: record.id.clone(),
                    reason: format!("record belongs to lane '{}'", record.lane),
                });
            }
            if !record.id_matches_lane() {
                return Err(MergeError::MalformedEvidence {
                    lane,
                    id: record.id.clone(),
                    reason: "ID is not prefixed with its lane".to_string(),
                });
            }
            if !seen.insert(record.id.clone()) {
                return Err(MergeError::MalformedEvidence {
                    lane,
                    id: record.id.clone(),
                    reason: "duplicate ID within lane".to_string(),
                });
            }
        }

        self.lanes.insert(lane, records);
        Ok(())
    }

    /// Lanes that have reported so far, in deterministic order.
    pub fn lanes(&self) -> impl Iterator<Item = Lane> + '_ {
        self.lanes.keys().copied()
    }

    pub fn record_count(&self) -> usize {
        self.lanes.values().map(Vec::len).sum()
    }

    /// Freeze the state for the judging phase. No further writers.
    pub fn freeze(self) -> FrozenEvidence {
        let ids = self
            .lanes
            .values()
            .flatten()
            .map(|r| r.id.clone())
            .collect();
        FrozenEvidence {
            lanes: self.lanes,
            ids,
        }
    }
}

/// Read-only view of the merged evidence, handed to the evaluator chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrozenEvidence {
    lanes: BTreeMap<Lane, Vec<EvidenceRecord>>,
    ids: BTreeSet<String>,
}

impl FrozenEvidence {
    /// Whether an evidence ID exists anywhere in the state. Used to
    /// verify judge citations.
    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Records for one lane, in emission order. Empty for unknown lanes.
    pub fn lane(&self, lane: Lane) -> &[EvidenceRecord] {
        self.lanes.get(&lane).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lanes(&self) -> impl Iterator<Item = Lane> + '_ {
        self.lanes.keys().copied()
    }

    /// All records, flattened in lane order then emission order.
    pub fn iter(&self) -> impl Iterator<Item = &EvidenceRecord> {
        self.lanes.values().flatten()
    }

    pub fn record_count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
