//! Repository lane: structural scan of a local checkout.
//!
//! The scan is pattern-based, not a parse of any one language. It looks
//! for the orchestration shapes the rubric cares about (concurrent
//! fan-out, shared-state reducers) and for unsafe execution constructs,
//! and reports both findings and explicit non-findings so judges see a
//! verified absence instead of silence.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tribunal_core::{EvidenceRecord, Lane, LaneRecorder};

use crate::analyzers::{Analyzer, AnalyzerError, AuditTarget};

/// Bound on the number of files read in one scan.
const MAX_FILES: usize = 512;
/// Files larger than this are skipped, not truncated.
const MAX_FILE_BYTES: u64 = 256 * 1024;

const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "rs", "js", "ts", "go", "java", "rb", "sh", "toml", "yaml", "yml",
];

const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "vendor", "dist", "__pycache__"];

lazy_static! {
    /// Concurrent dispatch of parallel workers.
    static ref FAN_OUT: Regex = Regex::new(
        r"(?i)JoinSet|join_all|asyncio\.gather|add_node|ThreadPoolExecutor|fan[_-]?out"
    )
    .expect("Invalid fan-out pattern");

    /// Conflict-free accumulation into shared state.
    static ref REDUCER: Regex = Regex::new(
        r"(?i)reducer|operator\.add|merge_state|\.merge\(|Annotated\[.+add"
    )
    .expect("Invalid reducer pattern");

    /// Arbitrary command or code execution.
    static ref UNSAFE_EXEC: Regex = Regex::new(
        r"os\.system|shell\s*=\s*True|\beval\s*\(|\bexec\s*\(|child_process"
    )
    .expect("Invalid unsafe-execution pattern");
}

/// Where a pattern first matched.
struct Finding {
    locator: String,
    excerpt: String,
}

/// Analyzer for the `repo` lane.
#[derive(Debug, Default)]
pub struct RepoAnalyzer;

impl RepoAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn scan(&self, root: &Path) -> Result<Vec<EvidenceRecord>, AnalyzerError> {
        let mut fan_out: Option<Finding> = None;
        let mut reducer: Option<Finding> = None;
        let mut unsafe_exec: Option<Finding> = None;
        let mut scanned = 0usize;

        for path in source_files(root)?.into_iter().take(MAX_FILES) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            scanned += 1;

            let relative = path.strip_prefix(root).unwrap_or(&path).display().to_string();
            record_first_match(&mut fan_out, &FAN_OUT, &content, &relative);
            record_first_match(&mut reducer, &REDUCER, &content, &relative);
            record_first_match(&mut unsafe_exec, &UNSAFE_EXEC, &content, &relative);
        }

        let mut recorder = LaneRecorder::new(Lane::Repo);
        push_structure(
            &mut recorder,
            fan_out,
            "orchestration graph fan-out detected",
            "orchestration graph fan-out not found",
        );
        push_structure(
            &mut recorder,
            reducer,
            "shared-state reducer merge detected",
            "shared-state reducer merge not found",
        );
        match unsafe_exec {
            Some(finding) => recorder.push(
                "unsafe execution detected in source",
                0.9,
                finding.locator,
                finding.excerpt,
            ),
            None => recorder.push(
                "no unsafe execution patterns found",
                0.8,
                format!("repo scan ({scanned} files)"),
                "",
            ),
        }

        Ok(recorder.finish())
    }
}

fn push_structure(
    recorder: &mut LaneRecorder,
    finding: Option<Finding>,
    found_claim: &str,
    missing_claim: &str,
) {
    match finding {
        Some(finding) => recorder.push(found_claim, 0.85, finding.locator, finding.excerpt),
        None => recorder.push(missing_claim, 0.0, "repo scan", ""),
    }
}

fn record_first_match(slot: &mut Option<Finding>, pattern: &Regex, content: &str, relative: &str) {
    if slot.is_some() {
        return;
    }
    for (index, line) in content.lines().enumerate() {
        if pattern.is_match(line) {
            *slot = Some(Finding {
                locator: format!("{}:{}", relative, index + 1),
                excerpt: line.trim().to_string(),
            });
            return;
        }
    }
}

/// Collect source files under `root` in deterministic (sorted) order.
fn source_files(root: &Path) -> Result<Vec<PathBuf>, AnalyzerError> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries: Vec<_> = fs::read_dir(&dir)?.filter_map(Result::ok).collect();
        entries.sort_by_key(|e| e.path());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            if path.is_dir() {
                if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_str()) {
                    continue;
                }
                stack.push(path);
            } else if is_source(&path) {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
                if size <= MAX_FILE_BYTES {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

#[async_trait]
impl Analyzer for RepoAnalyzer {
    fn lane(&self) -> Lane {
        Lane::Repo
    }

    async fn collect(&self, target: &AuditTarget) -> Result<Vec<EvidenceRecord>, AnalyzerError> {
        if !target.repo_path.exists() {
            return Err(AnalyzerError::MissingInput(format!(
                "repository path {} does not exist",
                target.repo_path.display()
            )));
        }
        tracing::debug!(path = %target.repo_path.display(), "scanning repository");
        self.scan(&target.repo_path)
    }
}
