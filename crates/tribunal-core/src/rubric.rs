//! Rubric parsing from YAML/JSON.
//!
//! A rubric is the fixed list of criteria every audit is scored against.
//! Criteria may carry optional weights; the overall score falls back to a
//! plain mean when no weights are present.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading rubrics.
#[derive(Error, Debug)]
pub enum RubricError {
    #[error("Failed to read rubric file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse rubric: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Rubric validation failed: {0}")]
    ValidationError(String),
}

/// One scoring dimension of the audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    /// Unique identifier (e.g., "graph_architecture").
    pub id: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// What the judges are asked to assess.
    #[serde(default)]
    pub description: String,

    /// Optional relative weight for the overall score.
    #[serde(default)]
    pub weight: Option<f64>,
}

/// An audit rubric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rubric {
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    /// Parse a rubric from YAML (JSON is a YAML subset and parses too).
    pub fn from_yaml(content: &str) -> Result<Self, RubricError> {
        let rubric: Rubric = serde_yaml::from_str(content)?;
        rubric.validate()?;
        Ok(rubric)
    }

    /// Load and parse a rubric file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<(), RubricError> {
        if self.criteria.is_empty() {
            return Err(RubricError::ValidationError(
                "rubric contains no criteria".to_string(),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for criterion in &self.criteria {
            if criterion.id.trim().is_empty() {
                return Err(RubricError::ValidationError(
                    "criterion with empty id".to_string(),
                ));
            }
            if !seen.insert(criterion.id.as_str()) {
                return Err(RubricError::ValidationError(format!(
                    "duplicate criterion id '{}'",
                    criterion.id
                )));
            }
            if let Some(weight) = criterion.weight {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(RubricError::ValidationError(format!(
                        "criterion '{}' has invalid weight {}",
                        criterion.id, weight
                    )));
                }
            }
        }

        Ok(())
    }

    /// Weight for a criterion; 0.0 when absent.
    pub fn weight_of(&self, criterion_id: &str) -> f64 {
        self.criteria
            .iter()
            .find(|c| c.id == criterion_id)
            .and_then(|c| c.weight)
            .unwrap_or(0.0)
    }

    /// True if at least one criterion carries a positive weight.
    pub fn has_weights(&self) -> bool {
        self.criteria
            .iter()
            .any(|c| c.weight.is_some_and(|w| w > 0.0))
    }
}
