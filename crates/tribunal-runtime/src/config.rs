//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Configuration for one audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Wall-clock budget for the whole pipeline. Expiry aborts in-flight
    /// work and fails the run without a partial report.
    #[serde(with = "duration_secs")]
    pub run_deadline: Duration,

    /// Per-analyzer deadline during the fan-out phase.
    #[serde(with = "duration_secs")]
    pub analyzer_deadline: Duration,

    /// Timeout for a single judge call (one attempt, before retries).
    #[serde(with = "duration_secs")]
    pub judge_call_timeout: Duration,

    /// Retry policy for transient judge failures.
    pub retry: RetryPolicy,

    /// Population-variance threshold for the dissent flag.
    pub dissent_threshold: f64,

    /// Maximum evidence lines included in a judge brief.
    pub max_brief_items: usize,

    /// Opinion cache settings.
    pub cache: CacheConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            run_deadline: Duration::from_secs(300),
            analyzer_deadline: Duration::from_secs(30),
            judge_call_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            dissent_threshold: tribunal_core::DEFAULT_DISSENT_THRESHOLD,
            max_brief_items: 10,
            cache: CacheConfig::default(),
        }
    }
}

/// Opinion cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1024,
            ttl: Duration::from_secs(3600),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
