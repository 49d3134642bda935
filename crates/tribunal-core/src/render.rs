//! Markdown rendering of the audit report.
//!
//! A pure projection: the markdown carries no state of its own and can be
//! regenerated from the JSON artifact at any time.

use std::fmt::Write;

use crate::types::AuditReport;

/// Render the report as a human-readable markdown document.
pub fn render_markdown(report: &AuditReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Audit Report\n");
    let _ = writeln!(out, "**Overall score: {}/5**\n", report.overall_score);
    let _ = writeln!(out, "{}\n", report.executive_summary);

    if !report.key_risks.is_empty() {
        let _ = writeln!(out, "## Key Risks\n");
        for risk in &report.key_risks {
            let _ = writeln!(out, "- {risk}");
        }
        let _ = writeln!(out);
    }

    for verdict in &report.criteria {
        let _ = writeln!(out, "## {}\n", verdict.criterion_id);
        let _ = writeln!(
            out,
            "Score: **{}/5** (judge average {:.2}, variance {:.2})\n",
            verdict.final_score, verdict.avg, verdict.variance
        );

        if verdict.fact_override_applied {
            let _ = writeln!(
                out,
                "> Fact override applied: structural verification outranked the judge average.\n"
            );
        }
        if verdict.dissent {
            let _ = writeln!(
                out,
                "> Dissent: the judges disagreed beyond the variance threshold.\n"
            );
        }

        render_list(&mut out, "Strengths", &verdict.strengths);
        render_list(&mut out, "Weaknesses", &verdict.weaknesses);
        render_list(&mut out, "Remediation", &verdict.remediation);
    }

    out
}

fn render_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "### {title}\n");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    let _ = writeln!(out);
}
