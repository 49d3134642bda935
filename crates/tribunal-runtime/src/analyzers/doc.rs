//! Document lane: cross-checks the target's self-assessment report.
//!
//! The report is split into paragraph chunks and each audited concept is
//! matched against all chunks; the best-supported chunk becomes that
//! concept's evidence. Concepts the report never mentions become
//! zero-confidence records, which the repository lane can contradict or
//! confirm.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use tribunal_core::{EvidenceRecord, Lane, LaneRecorder};

use crate::analyzers::{Analyzer, AnalyzerError, AuditTarget};

/// Confidence for a concept matched once; each extra match adds a step.
const BASE_CONFIDENCE: f64 = 0.6;
const CONFIDENCE_STEP: f64 = 0.1;

lazy_static! {
    static ref CONCEPTS: Vec<(&'static str, Regex)> = vec![
        (
            "orchestration graph",
            Regex::new(r"(?i)\bgraph\b|orchestrat|fan[\s_-]?out|parallel").expect("Invalid pattern"),
        ),
        (
            "shared-state reducer",
            Regex::new(r"(?i)reducer|shared\s+state|merge|accumulat").expect("Invalid pattern"),
        ),
        (
            "security sandboxing",
            Regex::new(r"(?i)sandbox|security|unsafe|shell|injection").expect("Invalid pattern"),
        ),
        (
            "failure handling",
            Regex::new(r"(?i)retry|retries|fallback|timeout|backoff|resilien").expect("Invalid pattern"),
        ),
        (
            "testing",
            Regex::new(r"(?i)\btest(s|ed|ing)?\b|coverage|property[\s_-]based").expect("Invalid pattern"),
        ),
    ];
}

/// Analyzer for the `doc` lane.
#[derive(Debug, Default)]
pub struct DocAnalyzer;

impl DocAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn inspect(&self, text: &str) -> Vec<EvidenceRecord> {
        let chunks = chunk_paragraphs(text);
        let mut recorder = LaneRecorder::new(Lane::Doc);

        for (concept, pattern) in CONCEPTS.iter() {
            match best_chunk(&chunks, pattern) {
                Some((index, matches, chunk)) => {
                    let confidence = (BASE_CONFIDENCE
                        + CONFIDENCE_STEP * (matches.saturating_sub(1)) as f64)
                        .min(0.95);
                    recorder.push(
                        format!("report discusses {concept}"),
                        confidence,
                        format!("chunk {index}"),
                        chunk,
                    );
                }
                None => recorder.push(
                    format!("report does not mention {concept}"),
                    0.0,
                    "document scan",
                    "",
                ),
            }
        }

        recorder.finish()
    }
}

/// Split into paragraph chunks, dropping blank ones.
fn chunk_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

/// The chunk with the most pattern hits, if any chunk matches at all.
fn best_chunk<'a>(chunks: &'a [String], pattern: &Regex) -> Option<(usize, usize, &'a str)> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| (index, pattern.find_iter(chunk).count(), chunk.as_str()))
        .filter(|(_, matches, _)| *matches > 0)
        .max_by_key(|(_, matches, _)| *matches)
}

#[async_trait]
impl Analyzer for DocAnalyzer {
    fn lane(&self) -> Lane {
        Lane::Doc
    }

    async fn collect(&self, target: &AuditTarget) -> Result<Vec<EvidenceRecord>, AnalyzerError> {
        let path = target.doc_path.as_ref().ok_or_else(|| {
            AnalyzerError::MissingInput("no self-assessment document provided".to_string())
        })?;
        tracing::debug!(path = %path.display(), "scanning report document");
        let text = fs::read_to_string(path)?;
        Ok(self.inspect(&text))
    }
}
