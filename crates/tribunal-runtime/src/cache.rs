//! Opinion caching.
//!
//! Identical (role, criterion, evidence) steps produce identical judge
//! prompts, so successful opinions are cached to cut repeat costs across
//! runs against the same snapshot.

use moka::future::Cache;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tribunal_core::{FrozenEvidence, JudgeRole, Opinion};

/// Cache key for one judge step.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct StepKey {
    role: JudgeRole,
    criterion_id: String,
    evidence_digest: u64,
}

/// Cache of successfully decoded opinions. Fallback opinions are never
/// cached; a degraded step should retry fresh next run.
pub struct OpinionCache {
    cache: Cache<StepKey, Opinion>,
}

impl OpinionCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub async fn get(
        &self,
        role: JudgeRole,
        criterion_id: &str,
        evidence: &FrozenEvidence,
    ) -> Option<Opinion> {
        self.cache.get(&key(role, criterion_id, evidence)).await
    }

    pub async fn insert(
        &self,
        role: JudgeRole,
        criterion_id: &str,
        evidence: &FrozenEvidence,
        opinion: Opinion,
    ) {
        if opinion.is_fallback() {
            return;
        }
        self.cache
            .insert(key(role, criterion_id, evidence), opinion)
            .await;
    }
}

fn key(role: JudgeRole, criterion_id: &str, evidence: &FrozenEvidence) -> StepKey {
    StepKey {
        role,
        criterion_id: criterion_id.to_string(),
        evidence_digest: digest(evidence),
    }
}

fn digest(evidence: &FrozenEvidence) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for record in evidence.iter() {
        record.id.hash(&mut hasher);
        record.claim.hash(&mut hasher);
        record.confidence.to_bits().hash(&mut hasher);
        record.locator.hash(&mut hasher);
    }
    hasher.finish()
}
