//! Evidence analyzers: the concurrent collection side of the pipeline.
//!
//! Each analyzer owns one lane and inspects the audit target
//! independently. Analyzers never see shared state; they return a batch
//! of records and the orchestrator merges it.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tribunal_core::{EvidenceRecord, Lane};

mod doc;
mod repo;

pub use doc::DocAnalyzer;
pub use repo::RepoAnalyzer;

/// What an audit run inspects: a local checkout plus an optional
/// self-assessment document.
#[derive(Debug, Clone)]
pub struct AuditTarget {
    pub repo_path: PathBuf,
    pub doc_path: Option<PathBuf>,
}

impl AuditTarget {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            doc_path: None,
        }
    }

    pub fn with_doc(mut self, doc_path: impl Into<PathBuf>) -> Self {
        self.doc_path = Some(doc_path.into());
        self
    }
}

/// Errors from evidence collection.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("I/O failure while inspecting target: {0}")]
    Io(#[from] std::io::Error),

    #[error("target input missing: {0}")]
    MissingInput(String),

    #[error("inspection failed: {0}")]
    Inspection(String),
}

/// One lane's evidence collector.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// The lane this analyzer writes into.
    fn lane(&self) -> Lane;

    /// Inspect the target and return this lane's evidence batch.
    async fn collect(&self, target: &AuditTarget) -> Result<Vec<EvidenceRecord>, AnalyzerError>;

    /// Per-analyzer deadline override; the orchestrator's configured
    /// analyzer deadline applies when `None`.
    fn deadline(&self) -> Option<Duration> {
        None
    }
}
