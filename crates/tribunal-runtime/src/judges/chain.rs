//! The evaluator chain: fixed-order, debate-style judging per criterion.
//!
//! Roles run strictly in chain order; each step sees every opinion the
//! earlier roles produced for the same criterion. A step can fail in two
//! ways (call failure after retries, or unparsable output) and both
//! degrade to the conservative fallback opinion so the chain always
//! reaches the chief justice with a full bench.

use backon::Retryable;
use std::sync::Arc;
use std::time::Duration;
use tribunal_core::{Criterion, FrozenEvidence, JudgeRole, Opinion};

use crate::cache::OpinionCache;
use crate::config::RuntimeConfig;
use crate::judges::{
    decode_opinion, evidence_brief, fallback_opinion, preferred_citations, JudgeClient,
    JudgeError, JudgeRequest,
};
use crate::retry::RetryPolicy;

/// Maximum evidence IDs suggested to a judge as citations.
const CITATION_LIMIT: usize = 3;

/// Runs the full judge bench for single criteria.
pub struct EvaluatorChain {
    client: Arc<dyn JudgeClient>,
    policy: RetryPolicy,
    call_timeout: Duration,
    max_brief_items: usize,
    cache: Option<OpinionCache>,
}

impl EvaluatorChain {
    pub fn new(client: Arc<dyn JudgeClient>, config: &RuntimeConfig) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| OpinionCache::new(config.cache.max_entries, config.cache.ttl));
        Self {
            client,
            policy: config.retry.clone(),
            call_timeout: config.judge_call_timeout,
            max_brief_items: config.max_brief_items,
            cache,
        }
    }

    /// Evaluate one criterion through the whole role chain.
    ///
    /// Always returns exactly one opinion per role.
    pub async fn evaluate_criterion(
        &self,
        criterion: &Criterion,
        evidence: &FrozenEvidence,
    ) -> Vec<Opinion> {
        let brief = evidence_brief(evidence, self.max_brief_items);
        let citation_order = preferred_citations(evidence, CITATION_LIMIT);

        let mut opinions = Vec::with_capacity(JudgeRole::CHAIN.len());
        for role in JudgeRole::CHAIN {
            let opinion = self
                .evaluate_step(role, criterion, evidence, &brief, &citation_order, &opinions)
                .await;
            opinions.push(opinion);
        }
        opinions
    }

    async fn evaluate_step(
        &self,
        role: JudgeRole,
        criterion: &Criterion,
        evidence: &FrozenEvidence,
        brief: &str,
        citation_order: &[String],
        prior_opinions: &[Opinion],
    ) -> Opinion {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(role, &criterion.id, evidence).await {
                tracing::debug!(role = %role, criterion = %criterion.id, "opinion cache hit");
                return hit;
            }
        }

        let request = JudgeRequest {
            role,
            criterion: criterion.clone(),
            evidence_brief: brief.to_string(),
            evidence_ids: citation_order.to_vec(),
            prior_opinions: prior_opinions.to_vec(),
        };

        tracing::debug!(role = %role, criterion = %criterion.id, "judge step in progress");

        let call = || async {
            match tokio::time::timeout(self.call_timeout, self.client.evaluate(&request)).await {
                Ok(result) => result,
                Err(_) => Err(JudgeError::Timeout(self.call_timeout)),
            }
        };

        let response = call
            .retry(self.policy.backoff())
            .when(JudgeError::is_transient)
            .notify(|err, delay| {
                tracing::warn!(error = %err, ?delay, "judge call failed, retrying");
            })
            .await;

        match response {
            Ok(raw) => match decode_opinion(&raw, role, &criterion.id) {
                Ok(mut opinion) => {
                    self.verify_citations(&mut opinion, evidence);
                    if let Some(cache) = &self.cache {
                        cache
                            .insert(role, &criterion.id, evidence, opinion.clone())
                            .await;
                    }
                    tracing::debug!(
                        role = %role,
                        criterion = %criterion.id,
                        score = opinion.score,
                        "judge step succeeded"
                    );
                    opinion
                }
                Err(err) => {
                    tracing::warn!(
                        role = %role,
                        criterion = %criterion.id,
                        error = %err,
                        "judge output rejected, falling back"
                    );
                    fallback_opinion(
                        role,
                        &criterion.id,
                        &format!("judge output failed validation ({err})"),
                    )
                }
            },
            Err(err) => {
                tracing::warn!(
                    role = %role,
                    criterion = %criterion.id,
                    error = %err,
                    "judge call exhausted retries, falling back"
                );
                fallback_opinion(role, &criterion.id, &format!("judge call failed ({err})"))
            }
        }
    }

    /// Strip citations that do not resolve in the frozen state. The
    /// opinion is kept; only its grounding weight drops.
    fn verify_citations(&self, opinion: &mut Opinion, evidence: &FrozenEvidence) {
        opinion.cited_evidence_ids.retain(|id| {
            let known = evidence.contains_id(id);
            if !known {
                tracing::warn!(
                    role = %opinion.judge_role,
                    criterion = %opinion.criterion_id,
                    citation = %id,
                    "stripped citation to unknown evidence"
                );
            }
            known
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judges::FALLBACK_SCORE;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tribunal_core::{AuditState, EvidenceRecord, Lane, ParseStatus};

    /// Test client that replays a fixed queue of responses.
    struct ScriptedJudge {
        responses: Mutex<VecDeque<Result<String, JudgeError>>>,
        seen_requests: Mutex<Vec<JudgeRequest>>,
    }

    impl ScriptedJudge {
        fn new(responses: Vec<Result<String, JudgeError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen_requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen_requests.lock().len()
        }
    }

    #[async_trait]
    impl JudgeClient for ScriptedJudge {
        async fn evaluate(&self, request: &JudgeRequest) -> Result<String, JudgeError> {
            self.seen_requests.lock().push(request.clone());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or(Err(JudgeError::Transient("script exhausted".to_string())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn criterion() -> Criterion {
        Criterion {
            id: "graph_architecture".to_string(),
            name: "Orchestration Graph".to_string(),
            description: String::new(),
            weight: None,
        }
    }

    fn frozen() -> FrozenEvidence {
        let mut state = AuditState::new();
        state
            .merge(
                Lane::Repo,
                vec![EvidenceRecord::new(Lane::Repo, 0, "fan-out found", 0.9, "loc", "")],
            )
            .unwrap();
        state.freeze()
    }

    fn ok_response(role: &str, score: u8) -> Result<String, JudgeError> {
        Ok(format!(
            r#"{{"judge":"{role}","criterion_id":"graph_architecture","score":{score},"argument":"ruling","cited_evidence":["repo:0"]}}"#
        ))
    }

    fn chain_config() -> RuntimeConfig {
        RuntimeConfig {
            retry: RetryPolicy::no_retries(),
            ..RuntimeConfig::default()
        }
    }

    #[tokio::test]
    async fn full_bench_produces_one_opinion_per_role() {
        let client = Arc::new(ScriptedJudge::new(vec![
            ok_response("Prosecutor", 2),
            ok_response("Defense", 4),
            ok_response("TechLead", 3),
        ]));
        let chain = EvaluatorChain::new(client.clone(), &chain_config());

        let opinions = chain.evaluate_criterion(&criterion(), &frozen()).await;

        assert_eq!(opinions.len(), 3);
        assert_eq!(
            opinions.iter().map(|o| o.judge_role).collect::<Vec<_>>(),
            JudgeRole::CHAIN.to_vec()
        );
        assert!(opinions.iter().all(|o| o.parse_status == ParseStatus::Ok));
    }

    #[tokio::test]
    async fn later_roles_see_prior_opinions() {
        let client = Arc::new(ScriptedJudge::new(vec![
            ok_response("Prosecutor", 1),
            ok_response("Defense", 5),
            ok_response("TechLead", 3),
        ]));
        let chain = EvaluatorChain::new(client.clone(), &chain_config());

        chain.evaluate_criterion(&criterion(), &frozen()).await;

        let requests = client.seen_requests.lock();
        assert_eq!(requests[0].prior_opinions.len(), 0);
        assert_eq!(requests[1].prior_opinions.len(), 1);
        assert_eq!(requests[2].prior_opinions.len(), 2);
        assert_eq!(requests[2].prior_opinions[1].score, 5);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_then_succeeds() {
        let mut config = chain_config();
        config.retry = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: false,
        };
        let client = Arc::new(ScriptedJudge::new(vec![
            Err(JudgeError::RateLimited { retry_after: None }),
            ok_response("Prosecutor", 3),
            ok_response("Defense", 3),
            ok_response("TechLead", 3),
        ]));
        let chain = EvaluatorChain::new(client.clone(), &config);

        let opinions = chain.evaluate_criterion(&criterion(), &frozen()).await;

        assert_eq!(opinions[0].parse_status, ParseStatus::Ok);
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn exhausted_retries_degrade_to_fallback() {
        let client = Arc::new(ScriptedJudge::new(vec![
            Err(JudgeError::RateLimited { retry_after: None }),
            ok_response("Defense", 4),
            ok_response("TechLead", 4),
        ]));
        let chain = EvaluatorChain::new(client.clone(), &chain_config());

        let opinions = chain.evaluate_criterion(&criterion(), &frozen()).await;

        assert_eq!(opinions[0].parse_status, ParseStatus::Fallback);
        assert_eq!(opinions[0].score, FALLBACK_SCORE);
        assert!(opinions[0].cited_evidence_ids.is_empty());
        // The chain kept going.
        assert_eq!(opinions[1].parse_status, ParseStatus::Ok);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let mut config = chain_config();
        config.retry = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: false,
        };
        let client = Arc::new(ScriptedJudge::new(vec![
            Err(JudgeError::Auth),
            ok_response("Defense", 3),
            ok_response("TechLead", 3),
        ]));
        let chain = EvaluatorChain::new(client.clone(), &config);

        let opinions = chain.evaluate_criterion(&criterion(), &frozen()).await;

        assert_eq!(opinions[0].parse_status, ParseStatus::Fallback);
        // One auth failure plus one call for each remaining role.
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn unparsable_output_degrades_to_fallback() {
        let client = Arc::new(ScriptedJudge::new(vec![
            Ok("I simply refuse to emit JSON.".to_string()),
            ok_response("Defense", 4),
            ok_response("TechLead", 4),
        ]));
        let chain = EvaluatorChain::new(client.clone(), &chain_config());

        let opinions = chain.evaluate_criterion(&criterion(), &frozen()).await;

        assert_eq!(opinions[0].parse_status, ParseStatus::Fallback);
        assert_eq!(opinions[0].score, FALLBACK_SCORE);
    }

    #[tokio::test]
    async fn unknown_citations_are_stripped_not_fatal() {
        let response = Ok(r#"{"judge":"Prosecutor","criterion_id":"graph_architecture","score":4,"argument":"ok","cited_evidence":["repo:0","repo:99","doc:7"]}"#.to_string());
        let client = Arc::new(ScriptedJudge::new(vec![
            response,
            ok_response("Defense", 4),
            ok_response("TechLead", 4),
        ]));
        let chain = EvaluatorChain::new(client, &chain_config());

        let opinions = chain.evaluate_criterion(&criterion(), &frozen()).await;

        assert_eq!(opinions[0].parse_status, ParseStatus::Ok);
        assert_eq!(opinions[0].cited_evidence_ids, vec!["repo:0"]);
    }

    #[tokio::test]
    async fn identical_step_hits_the_cache() {
        let client = Arc::new(ScriptedJudge::new(vec![
            ok_response("Prosecutor", 3),
            ok_response("Defense", 3),
            ok_response("TechLead", 3),
        ]));
        let chain = EvaluatorChain::new(client.clone(), &chain_config());
        let evidence = frozen();

        chain.evaluate_criterion(&criterion(), &evidence).await;
        assert_eq!(client.calls(), 3);

        let opinions = chain.evaluate_criterion(&criterion(), &evidence).await;
        assert_eq!(client.calls(), 3);
        assert_eq!(opinions.len(), 3);
    }
}
