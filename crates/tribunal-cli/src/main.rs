//! `tribunal` — run a full audit against a local checkout.
//!
//! Wires the built-in analyzers and the deterministic judge into the
//! orchestrator, then writes the JSON and markdown artifacts.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tribunal_core::{render_markdown, Rubric};
use tribunal_runtime::{
    AuditTarget, DocAnalyzer, HeuristicJudge, Orchestrator, RepoAnalyzer, RuntimeConfig,
};

#[derive(Parser, Debug)]
#[command(name = "tribunal", version, about = "Swarm audit of a repository against a rubric")]
struct Cli {
    /// Path to the repository checkout to audit.
    #[arg(long)]
    repo: PathBuf,

    /// Optional self-assessment document (markdown or plain text).
    #[arg(long)]
    doc: Option<PathBuf>,

    /// Rubric file (YAML or JSON).
    #[arg(long)]
    rubric: PathBuf,

    /// Directory for the report artifacts.
    #[arg(long, default_value = "audit-out")]
    out: PathBuf,

    /// Wall-clock budget for the whole run, e.g. "300s" or "5m".
    #[arg(long, value_parser = humantime::parse_duration)]
    deadline: Option<Duration>,

    /// Print the report JSON to stdout instead of the markdown summary.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let rubric = Rubric::from_file(&cli.rubric)
        .with_context(|| format!("failed to load rubric from {}", cli.rubric.display()))?;

    let mut config = RuntimeConfig::default();
    if let Some(deadline) = cli.deadline {
        config.run_deadline = deadline;
    }

    let mut builder = Orchestrator::builder(Arc::new(HeuristicJudge::new()))
        .analyzer(Arc::new(RepoAnalyzer::new()))
        .config(config);
    if cli.doc.is_some() {
        builder = builder.analyzer(Arc::new(DocAnalyzer::new()));
    }
    let orchestrator = builder.build();

    let mut target = AuditTarget::new(&cli.repo);
    if let Some(doc) = &cli.doc {
        target = target.with_doc(doc);
    }

    let started = chrono::Utc::now();
    tracing::info!(repo = %cli.repo.display(), criteria = rubric.criteria.len(), "audit starting");

    let outcome = orchestrator
        .run(&target, &rubric)
        .await
        .context("audit run failed")?;

    tracing::info!(
        overall = outcome.report.overall_score,
        elapsed = %format_elapsed(started),
        "audit complete"
    );

    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("failed to create {}", cli.out.display()))?;

    let json_path = cli.out.join("report.json");
    let json = serde_json::to_string_pretty(&outcome.report)?;
    std::fs::write(&json_path, &json)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let markdown = render_markdown(&outcome.report);
    let md_path = cli.out.join("report.md");
    std::fs::write(&md_path, &markdown)
        .with_context(|| format!("failed to write {}", md_path.display()))?;

    if cli.json {
        println!("{json}");
    } else {
        println!("{markdown}");
    }

    Ok(())
}

fn format_elapsed(started: chrono::DateTime<chrono::Utc>) -> String {
    let elapsed = chrono::Utc::now() - started;
    format!("{:.1}s", elapsed.num_milliseconds() as f64 / 1000.0)
}
