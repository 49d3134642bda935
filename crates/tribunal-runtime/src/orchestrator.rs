//! The audit pipeline: fan-out, merge, freeze, judge, deliberate.
//!
//! Analyzers run concurrently and their batches merge into shared state
//! under a lock; the merged state is then frozen and every later stage
//! reads the same immutable snapshot. Judging fans out per criterion
//! (each criterion's role chain stays sequential), and the chief justice
//! synthesizes the report at the end.
//!
//! Degradation policy: a failing, slow, or panicking analyzer becomes a
//! diagnostic record in its lane, a failing judge step becomes a
//! fallback opinion, and a batch the merger rejects outright is carried
//! into the report's key risks. Only two things fail a run: an
//! unreachable target and the run deadline.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tribunal_core::{
    AuditReport, AuditState, ChiefJustice, EvidenceRecord, FactSignals, FrozenEvidence, Lane,
    MergeError, Opinion, Rubric,
};

use crate::analyzers::{Analyzer, AuditTarget};
use crate::config::RuntimeConfig;
use crate::facts::derive_fact_signals;
use crate::judges::{EvaluatorChain, JudgeClient};

/// Run-fatal errors. Everything else degrades in place.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("audit target unavailable: {0}")]
    TargetUnavailable(String),

    #[error("run deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Everything a completed run produced, not just the report.
#[derive(Debug)]
pub struct AuditOutcome {
    pub report: AuditReport,
    pub evidence: FrozenEvidence,
    pub opinions: Vec<Opinion>,
    pub facts: FactSignals,
}

/// Drives one audit run end to end.
pub struct Orchestrator {
    analyzers: Vec<Arc<dyn Analyzer>>,
    chain: EvaluatorChain,
    config: RuntimeConfig,
}

/// Builder for [`Orchestrator`]. The judge client is mandatory;
/// analyzers and config have workable defaults.
pub struct OrchestratorBuilder {
    analyzers: Vec<Arc<dyn Analyzer>>,
    judge: Arc<dyn JudgeClient>,
    config: RuntimeConfig,
}

impl OrchestratorBuilder {
    pub fn analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Orchestrator {
        let chain = EvaluatorChain::new(self.judge, &self.config);
        Orchestrator {
            analyzers: self.analyzers,
            chain,
            config: self.config,
        }
    }
}

impl Orchestrator {
    pub fn builder(judge: Arc<dyn JudgeClient>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            analyzers: Vec::new(),
            judge,
            config: RuntimeConfig::default(),
        }
    }

    /// Run the full pipeline against one target.
    pub async fn run(
        &self,
        target: &AuditTarget,
        rubric: &Rubric,
    ) -> Result<AuditOutcome, AuditError> {
        if !target.repo_path.exists() {
            return Err(AuditError::TargetUnavailable(format!(
                "repository path {} does not exist",
                target.repo_path.display()
            )));
        }

        // Deadline expiry drops the inner future; the JoinSet inside it
        // aborts any analyzers still in flight.
        tokio::time::timeout(self.config.run_deadline, self.run_inner(target, rubric))
            .await
            .map_err(|_| AuditError::DeadlineExceeded(self.config.run_deadline))
    }

    async fn run_inner(&self, target: &AuditTarget, rubric: &Rubric) -> AuditOutcome {
        let (evidence, mut merge_notices) = self.collect_evidence(target).await;
        tracing::info!(
            records = evidence.record_count(),
            lanes = evidence.lanes().count(),
            "evidence state frozen"
        );

        let facts = derive_fact_signals(rubric, &evidence);

        let per_criterion = futures::future::join_all(
            rubric
                .criteria
                .iter()
                .map(|criterion| self.chain.evaluate_criterion(criterion, &evidence)),
        )
        .await;
        let opinions: Vec<Opinion> = per_criterion.into_iter().flatten().collect();
        tracing::info!(
            opinions = opinions.len(),
            fallbacks = opinions.iter().filter(|o| o.is_fallback()).count(),
            "bench complete"
        );

        let justice = ChiefJustice::with_dissent_threshold(self.config.dissent_threshold);
        let mut report = justice.deliberate(rubric, &opinions, &facts);

        // Discarded evidence never disappears silently: merge rejections
        // surface as key risks. Sorted so join order cannot reorder them.
        if !merge_notices.is_empty() {
            merge_notices.sort();
            report.key_risks.extend(merge_notices);
        }

        AuditOutcome {
            report,
            evidence,
            opinions,
            facts,
        }
    }

    /// Fan out all analyzers, merge their batches as they land, freeze.
    ///
    /// Returns the frozen state plus the merge-rejection notices destined
    /// for the report's key risks. Every spawned lane ends up known: even
    /// a panicked task is mapped back to its lane through the task ID and
    /// merged as a diagnostic record.
    async fn collect_evidence(&self, target: &AuditTarget) -> (FrozenEvidence, Vec<String>) {
        let mut tasks = JoinSet::new();
        let mut task_lanes: HashMap<tokio::task::Id, Lane> = HashMap::new();
        for analyzer in &self.analyzers {
            let lane = analyzer.lane();
            let analyzer = Arc::clone(analyzer);
            let target = target.clone();
            let deadline = analyzer.deadline().unwrap_or(self.config.analyzer_deadline);
            let handle = tasks.spawn(async move {
                let batch = match tokio::time::timeout(deadline, analyzer.collect(&target)).await {
                    Ok(Ok(records)) if !records.is_empty() => records,
                    Ok(Ok(_)) => {
                        vec![EvidenceRecord::diagnostic(lane, "analyzer produced no evidence")]
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(lane = %lane, error = %err, "analyzer failed");
                        vec![EvidenceRecord::diagnostic(
                            lane,
                            format!("analyzer failed: {err}"),
                        )]
                    }
                    Err(_) => {
                        tracing::warn!(lane = %lane, ?deadline, "analyzer timed out");
                        vec![EvidenceRecord::diagnostic(lane, "analyzer timed out")]
                    }
                };
                (lane, batch)
            });
            task_lanes.insert(handle.id(), lane);
        }

        let state = Mutex::new(AuditState::new());
        let mut notices = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (lane, batch) = match joined {
                Ok((_, result)) => result,
                Err(err) => {
                    let Some(&lane) = task_lanes.get(&err.id()) else {
                        tracing::error!(error = %err, "task failure for unknown lane");
                        continue;
                    };
                    tracing::error!(lane = %lane, error = %err, "analyzer task panicked");
                    (lane, vec![EvidenceRecord::diagnostic(lane, "analyzer panicked")])
                }
            };

            let mut guard = state.lock();
            match guard.merge(lane, batch) {
                Ok(()) => tracing::debug!(lane = %lane, "lane merged"),
                Err(MergeError::DuplicateLane(lane)) => {
                    tracing::error!(lane = %lane, "duplicate lane batch rejected");
                    notices.push(format!(
                        "Evidence batch for lane '{lane}' rejected as a duplicate delivery; its records were discarded."
                    ));
                }
                Err(MergeError::MalformedEvidence { lane, id, reason }) => {
                    tracing::error!(lane = %lane, id = %id, reason = %reason, "malformed batch rejected");
                    let diagnostic = EvidenceRecord::diagnostic(
                        lane,
                        format!("analyzer emitted malformed evidence ({id}): {reason}"),
                    );
                    if guard.merge(lane, vec![diagnostic]).is_err() {
                        notices.push(format!(
                            "Malformed evidence batch for lane '{lane}' rejected and discarded ({id}: {reason})."
                        ));
                    }
                }
            }
        }

        (state.into_inner().freeze(), notices)
    }
}
