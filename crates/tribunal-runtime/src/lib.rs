//! # tribunal-runtime
//!
//! The effectful half of the Tribunal audit engine: concurrent evidence
//! analyzers, the retrying judge chain, and the orchestrator that wires
//! them into `tribunal-core`'s deterministic synthesis.
//!
//! ## Pipeline
//!
//! ```text
//! analyzers (concurrent) -> merge -> freeze -> judge chains (per criterion)
//!                                                    |
//!                              facts ----------------+--> chief justice -> report
//! ```
//!
//! Failures degrade in place: a broken analyzer lane becomes a diagnostic
//! record, a broken judge step becomes a fallback opinion, and the run
//! still produces a complete report. Only an unreachable target or the
//! run deadline fails a run.

pub mod analyzers;
pub mod cache;
pub mod config;
pub mod facts;
pub mod judges;
pub mod orchestrator;
pub mod retry;

pub use analyzers::{Analyzer, AnalyzerError, AuditTarget, DocAnalyzer, RepoAnalyzer};
pub use cache::OpinionCache;
pub use config::{CacheConfig, RuntimeConfig};
pub use facts::derive_fact_signals;
pub use judges::{
    evidence_brief, preferred_citations, EvaluatorChain, HeuristicJudge, JudgeClient, JudgeError,
    JudgeRequest, FALLBACK_SCORE,
};
pub use orchestrator::{AuditError, AuditOutcome, Orchestrator, OrchestratorBuilder};
pub use retry::RetryPolicy;
