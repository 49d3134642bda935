//! Chief justice: deterministic synthesis of judge opinions into verdicts.
//!
//! Synthesis is a pure function of its inputs. The same opinion set and
//! fact signals always produce a byte-identical report, so a disputed
//! audit can be re-deliberated offline. Facts outrank opinions: a missing
//! structural signal caps the score no matter how the judges voted.

use std::collections::BTreeMap;

use crate::rubric::Rubric;
use crate::types::{AuditReport, CriterionVerdict, FactSignal, FactSignals, Opinion};

/// Default dissent threshold on the population variance of scores.
///
/// `2/3` is the smallest variance a 2-point spread can produce among three
/// judges (`{1,2,3}`), so any such spread raises the dissent flag while a
/// 1-point spread (`{1,2,1}` = 0.22) does not.
pub const DEFAULT_DISSENT_THRESHOLD: f64 = 2.0 / 3.0;

/// Justification text is carried into strengths/weaknesses verbatim but
/// truncated to this many characters.
pub const JUSTIFICATION_CLIP: usize = 180;

const GENERIC_REMEDIATION: [&str; 2] = [
    "Address judge weaknesses and add stronger evidence citations.",
    "Ensure report claims match the repository implementation.",
];

/// Deterministic aggregator for judge opinions.
pub struct ChiefJustice {
    dissent_threshold: f64,
}

impl ChiefJustice {
    pub fn new() -> Self {
        Self {
            dissent_threshold: DEFAULT_DISSENT_THRESHOLD,
        }
    }

    /// Override the dissent variance threshold.
    pub fn with_dissent_threshold(threshold: f64) -> Self {
        Self {
            dissent_threshold: threshold,
        }
    }

    /// Synthesize one criterion's opinions into a verdict.
    ///
    /// Pure: no I/O, no clock, no randomness.
    pub fn synthesize(
        &self,
        criterion_id: &str,
        opinions: &[Opinion],
        fact: &FactSignal,
    ) -> CriterionVerdict {
        if opinions.is_empty() {
            return self.empty_verdict(criterion_id, fact);
        }

        let scores: Vec<f64> = opinions.iter().map(|o| f64::from(o.score)).collect();
        let avg = scores.iter().sum::<f64>() / scores.len() as f64;
        let variance = population_variance(&scores);

        let mut final_score = round_half_up(avg).clamp(1, 5);
        let dissent = variance >= self.dissent_threshold;

        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();

        // Highest- and lowest-scoring non-fallback opinions win; ties go
        // to the lowest role index. Opinions arrive in chain order, so a
        // strict comparison keeps the earlier role on ties.
        let graded: Vec<&Opinion> = opinions.iter().filter(|o| !o.is_fallback()).collect();
        if let Some(best) = graded
            .iter()
            .copied()
            .reduce(|a, b| if b.score > a.score { b } else { a })
        {
            strengths.push(attributed_excerpt(best));
        }
        if let Some(worst) = graded
            .iter()
            .copied()
            .reduce(|a, b| if b.score < a.score { b } else { a })
        {
            weaknesses.push(attributed_excerpt(worst));
        }

        if graded.is_empty() {
            weaknesses.push(
                "All judge opinions for this criterion degraded to fallback responses."
                    .to_string(),
            );
        } else {
            // Fallback degradation is never hidden: name the roles that fell back.
            for opinion in opinions.iter().filter(|o| o.is_fallback()) {
                weaknesses.push(format!(
                    "{} opinion degraded to fallback: {}",
                    opinion.judge_role,
                    clip_chars(&opinion.justification, JUSTIFICATION_CLIP)
                ));
            }
        }

        let mut remediation: Vec<String> =
            GENERIC_REMEDIATION.iter().map(|s| s.to_string()).collect();

        let mut fact_override_applied = false;
        if !fact.satisfied {
            tracing::debug!(
                criterion = criterion_id,
                judged = final_score,
                detail = %fact.detail,
                "fact override capping criterion score"
            );
            final_score = final_score.min(2);
            fact_override_applied = true;
            weaknesses.push(format!("Structural verification failed: {}", fact.detail));
            remediation.push(format!(
                "Restore the missing structural signal before re-auditing: {}",
                fact.detail
            ));
        }

        CriterionVerdict {
            criterion_id: criterion_id.to_string(),
            final_score,
            avg,
            variance,
            strengths,
            weaknesses,
            remediation,
            dissent,
            fact_override_applied,
        }
    }

    /// Deliberate over a full opinion set: group by criterion in rubric
    /// order, synthesize each, and compose the final report.
    pub fn deliberate(
        &self,
        rubric: &Rubric,
        opinions: &[Opinion],
        facts: &FactSignals,
    ) -> AuditReport {
        let mut grouped: BTreeMap<&str, Vec<Opinion>> = BTreeMap::new();
        for opinion in opinions {
            grouped
                .entry(opinion.criterion_id.as_str())
                .or_default()
                .push(opinion.clone());
        }

        let satisfied_default = FactSignal::satisfied("no structural check registered");
        let mut verdicts = Vec::with_capacity(rubric.criteria.len());
        let mut key_risks = Vec::new();

        for criterion in &rubric.criteria {
            let ops = grouped
                .get(criterion.id.as_str())
                .map_or(&[][..], |v| v.as_slice());
            let fact = facts.get(&criterion.id).unwrap_or(&satisfied_default);

            if ops.is_empty() {
                key_risks.push(format!("Missing judge output for {}.", criterion.id));
            }
            if fact.unsafe_execution {
                key_risks.push(format!(
                    "{}: unsafe execution pattern flagged ({}).",
                    criterion.id, fact.detail
                ));
            }

            verdicts.push(self.synthesize(&criterion.id, ops, fact));
        }

        let overall_score = self.overall_score(rubric, &verdicts);

        let executive_summary = format!(
            "Audit complete. Overall score {}/5 across {} criteria from {} judicial opinions.",
            overall_score,
            verdicts.len(),
            opinions.len()
        );

        AuditReport {
            overall_score,
            executive_summary,
            criteria: verdicts,
            key_risks,
        }
    }

    /// Weight-aware mean of final scores, rounded half-up into [1,5].
    fn overall_score(&self, rubric: &Rubric, verdicts: &[CriterionVerdict]) -> u8 {
        if verdicts.is_empty() {
            return 1;
        }

        let weighted: Vec<(f64, f64)> = verdicts
            .iter()
            .map(|v| (f64::from(v.final_score), rubric.weight_of(&v.criterion_id)))
            .filter(|&(_, w)| w > 0.0)
            .collect();

        let mean = if weighted.is_empty() {
            verdicts.iter().map(|v| f64::from(v.final_score)).sum::<f64>()
                / verdicts.len() as f64
        } else {
            let sum: f64 = weighted.iter().map(|(s, w)| s * w).sum();
            let wsum: f64 = weighted.iter().map(|(_, w)| w).sum();
            sum / wsum
        };

        round_half_up(mean).clamp(1, 5)
    }

    fn empty_verdict(&self, criterion_id: &str, fact: &FactSignal) -> CriterionVerdict {
        let mut weaknesses = vec!["No judge opinions were produced for this criterion.".to_string()];
        let mut remediation: Vec<String> =
            GENERIC_REMEDIATION.iter().map(|s| s.to_string()).collect();
        remediation
            .push("Ensure each judge produces an opinion for every rubric criterion.".to_string());

        let mut fact_override_applied = false;
        if !fact.satisfied {
            fact_override_applied = true;
            weaknesses.push(format!("Structural verification failed: {}", fact.detail));
            remediation.push(format!(
                "Restore the missing structural signal before re-auditing: {}",
                fact.detail
            ));
        }

        CriterionVerdict {
            criterion_id: criterion_id.to_string(),
            final_score: 1,
            avg: 0.0,
            variance: 0.0,
            strengths: Vec::new(),
            weaknesses,
            remediation,
            dissent: false,
            fact_override_applied,
        }
    }
}

impl Default for ChiefJustice {
    fn default() -> Self {
        Self::new()
    }
}

/// `round(x)` with halves always rounding up (so 2.5 -> 3, never 2).
fn round_half_up(x: f64) -> u8 {
    (x + 0.5).floor() as u8
}

fn population_variance(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64
}

fn attributed_excerpt(opinion: &Opinion) -> String {
    format!(
        "{}: {}",
        opinion.judge_role,
        clip_chars(&opinion.justification, JUSTIFICATION_CLIP)
    )
}

fn clip_chars(text: &str, n: usize) -> String {
    if text.chars().count() <= n {
        text.to_string()
    } else {
        text.chars().take(n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JudgeRole, ParseStatus};
    use proptest::prelude::*;

    fn opinion(role: JudgeRole, score: u8) -> Opinion {
        Opinion {
            criterion_id: "judicial_nuance".to_string(),
            judge_role: role,
            score,
            justification: format!("{role} scored {score}."),
            cited_evidence_ids: vec!["repo:0".to_string()],
            parse_status: ParseStatus::Ok,
        }
    }

    fn fallback(role: JudgeRole) -> Opinion {
        Opinion {
            criterion_id: "judicial_nuance".to_string(),
            judge_role: role,
            score: 2,
            justification: "Judge call failed; safe fallback used.".to_string(),
            cited_evidence_ids: Vec::new(),
            parse_status: ParseStatus::Fallback,
        }
    }

    fn ok_fact() -> FactSignal {
        FactSignal::satisfied("structure verified")
    }

    #[test]
    fn unanimous_high_scores_carry_no_dissent() {
        let justice = ChiefJustice::new();
        let ops = vec![
            opinion(JudgeRole::Prosecutor, 5),
            opinion(JudgeRole::Defense, 5),
            opinion(JudgeRole::TechLead, 5),
        ];
        let verdict = justice.synthesize("judicial_nuance", &ops, &ok_fact());
        assert_eq!(verdict.final_score, 5);
        assert_eq!(verdict.variance, 0.0);
        assert!(!verdict.dissent);
    }

    #[test]
    fn wide_spread_raises_dissent() {
        let justice = ChiefJustice::new();
        let ops = vec![
            opinion(JudgeRole::Prosecutor, 1),
            opinion(JudgeRole::Defense, 5),
            opinion(JudgeRole::TechLead, 3),
        ];
        let verdict = justice.synthesize("judicial_nuance", &ops, &ok_fact());
        assert!(verdict.variance >= DEFAULT_DISSENT_THRESHOLD);
        assert!(verdict.dissent);
        assert_eq!(verdict.final_score, 3);
    }

    #[test]
    fn low_scores_with_small_spread_do_not_dissent() {
        let justice = ChiefJustice::new();
        let ops = vec![
            opinion(JudgeRole::Prosecutor, 1),
            opinion(JudgeRole::Defense, 2),
            opinion(JudgeRole::TechLead, 1),
        ];
        let verdict = justice.synthesize("judicial_nuance", &ops, &ok_fact());
        assert!((verdict.avg - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(verdict.final_score, 1);
        assert!(!verdict.dissent);
    }

    #[test]
    fn two_point_spread_among_three_judges_dissents() {
        let justice = ChiefJustice::new();
        let ops = vec![
            opinion(JudgeRole::Prosecutor, 1),
            opinion(JudgeRole::Defense, 2),
            opinion(JudgeRole::TechLead, 3),
        ];
        let verdict = justice.synthesize("judicial_nuance", &ops, &ok_fact());
        assert!(verdict.dissent);
    }

    #[test]
    fn fact_override_caps_generous_scores() {
        let justice = ChiefJustice::new();
        let ops = vec![
            opinion(JudgeRole::Prosecutor, 4),
            opinion(JudgeRole::Defense, 5),
            opinion(JudgeRole::TechLead, 5),
        ];
        let fact = FactSignal::missing("no orchestration graph evidence found");
        let verdict = justice.synthesize("graph_architecture", &ops, &fact);
        assert_eq!(verdict.final_score, 2);
        assert!(verdict.fact_override_applied);
        assert!(verdict
            .weaknesses
            .iter()
            .any(|w| w.contains("Structural verification failed")));
        assert!(verdict.remediation.len() > GENERIC_REMEDIATION.len());
    }

    #[test]
    fn ties_go_to_the_lowest_role_index() {
        let justice = ChiefJustice::new();
        let ops = vec![
            opinion(JudgeRole::Prosecutor, 3),
            opinion(JudgeRole::Defense, 3),
            opinion(JudgeRole::TechLead, 3),
        ];
        let verdict = justice.synthesize("judicial_nuance", &ops, &ok_fact());
        assert!(verdict.strengths[0].starts_with("Prosecutor:"));
        assert!(verdict.weaknesses[0].starts_with("Prosecutor:"));
    }

    #[test]
    fn all_fallback_yields_diagnostic_weakness() {
        let justice = ChiefJustice::new();
        let ops = vec![
            fallback(JudgeRole::Prosecutor),
            fallback(JudgeRole::Defense),
            fallback(JudgeRole::TechLead),
        ];
        let verdict = justice.synthesize("judicial_nuance", &ops, &ok_fact());
        assert!(verdict.strengths.is_empty());
        assert_eq!(verdict.weaknesses.len(), 1);
        assert!(verdict.weaknesses[0].contains("fallback"));
    }

    #[test]
    fn partial_fallback_is_visible() {
        let justice = ChiefJustice::new();
        let ops = vec![
            opinion(JudgeRole::Prosecutor, 4),
            fallback(JudgeRole::Defense),
            opinion(JudgeRole::TechLead, 4),
        ];
        let verdict = justice.synthesize("judicial_nuance", &ops, &ok_fact());
        assert!(verdict
            .weaknesses
            .iter()
            .any(|w| w.starts_with("Defense opinion degraded to fallback")));
    }

    #[test]
    fn no_opinions_floors_the_score() {
        let justice = ChiefJustice::new();
        let verdict = justice.synthesize("judicial_nuance", &[], &ok_fact());
        assert_eq!(verdict.final_score, 1);
        assert!(verdict.weaknesses[0].contains("No judge opinions"));
    }

    #[test]
    fn fact_override_without_opinions_still_adds_remediation() {
        let justice = ChiefJustice::new();
        let fact = FactSignal::missing("no reducer evidence found");
        let verdict = justice.synthesize("graph_architecture", &[], &fact);
        assert!(verdict.fact_override_applied);
        assert!(verdict
            .weaknesses
            .iter()
            .any(|w| w.contains("Structural verification failed")));
        assert!(verdict
            .remediation
            .iter()
            .any(|r| r.contains("no reducer evidence found")));
    }

    #[test]
    fn deliberate_weighs_criteria_and_collects_risks() {
        let rubric = Rubric::from_yaml(
            r#"
criteria:
  - id: graph_architecture
    weight: 3.0
  - id: security_sandboxing
    weight: 1.0
"#,
        )
        .unwrap();

        let mut opinions = Vec::new();
        for role in JudgeRole::CHAIN {
            let mut op = opinion(role, 5);
            op.criterion_id = "graph_architecture".to_string();
            opinions.push(op);
            let mut op = opinion(role, 1);
            op.criterion_id = "security_sandboxing".to_string();
            opinions.push(op);
        }

        let mut facts = FactSignals::new();
        facts.insert(
            "security_sandboxing".to_string(),
            FactSignal::unsafe_execution("shell=True invocation in runner.py"),
        );

        let justice = ChiefJustice::new();
        let report = justice.deliberate(&rubric, &opinions, &facts);

        // weighted mean: (5*3 + 1*1) / 4 = 4
        assert_eq!(report.overall_score, 4);
        assert!(report
            .key_risks
            .iter()
            .any(|r| r.contains("unsafe execution")));
        assert_eq!(report.criteria.len(), 2);
        assert!(report.criteria[1].fact_override_applied);
    }

    #[test]
    fn deliberate_flags_missing_judge_output() {
        let rubric = Rubric::from_yaml("criteria: [{id: judicial_nuance}]").unwrap();
        let justice = ChiefJustice::new();
        let report = justice.deliberate(&rubric, &[], &FactSignals::new());
        assert_eq!(report.overall_score, 1);
        assert!(report.key_risks[0].contains("Missing judge output"));
    }

    #[test]
    fn round_half_up_rounds_halves_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(1.33), 1);
        assert_eq!(round_half_up(4.5), 5);
        assert_eq!(round_half_up(3.49), 3);
    }

    proptest! {
        /// Synthesis is a pure function: identical inputs produce
        /// byte-identical verdicts.
        #[test]
        fn synthesis_is_deterministic(
            scores in proptest::collection::vec(1u8..=5, 1..=3),
            satisfied in any::<bool>(),
        ) {
            let ops: Vec<Opinion> = scores
                .iter()
                .zip(JudgeRole::CHAIN)
                .map(|(&score, role)| opinion(role, score))
                .collect();
            let fact = if satisfied {
                FactSignal::satisfied("ok")
            } else {
                FactSignal::missing("signal absent")
            };

            let justice = ChiefJustice::new();
            let first = serde_json::to_string(&justice.synthesize("judicial_nuance", &ops, &fact)).unwrap();
            let second = serde_json::to_string(&justice.synthesize("judicial_nuance", &ops, &fact)).unwrap();
            prop_assert_eq!(first, second);
        }

        /// Fact supremacy: an unsatisfied signal bounds the final score
        /// at 2 for any opinion set.
        #[test]
        fn fact_supremacy_caps_any_opinion_set(
            scores in proptest::collection::vec(1u8..=5, 0..=3),
        ) {
            let ops: Vec<Opinion> = scores
                .iter()
                .zip(JudgeRole::CHAIN)
                .map(|(&score, role)| opinion(role, score))
                .collect();
            let fact = FactSignal::missing("required signal missing");
            let verdict = ChiefJustice::new().synthesize("graph_architecture", &ops, &fact);
            prop_assert!(verdict.final_score <= 2);
            prop_assert!(verdict.fact_override_applied);
        }
    }
}
