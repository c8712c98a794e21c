//! Rubric and requirement knowledge-base configuration.
//!
//! Both files live under `config/`: the rubric carries the thresholds test
//! cases are judged against, the knowledge base the requirement context the
//! prompt embeds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ProjectPaths;
use crate::error::{EvalError, Result, StoreError};

/// Rubric file name under `config/`.
pub const RUBRIC_FILE: &str = "test_case_rules.json";

/// Knowledge-base file name under `config/`.
pub const KNOWLEDGE_FILE: &str = "require_list_config.json";

/// Acceptable percentage range for one priority label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorityRange {
    /// Minimum share, percent.
    pub min: u32,
    /// Maximum share, percent.
    pub max: u32,
}

/// The test-case rubric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RubricConfig {
    /// Maximum title length in characters.
    #[serde(default)]
    pub title_max_length: usize,
    /// Maximum number of steps per case.
    #[serde(default)]
    pub max_steps: usize,
    /// Priority label -> acceptable percentage range.
    #[serde(default)]
    pub priority_ratios: BTreeMap<String, PriorityRange>,
    /// Rubric version.
    #[serde(default)]
    pub version: String,
    /// ISO-8601 last-updated stamp.
    #[serde(default)]
    pub last_updated: String,
}

/// One requirement knowledge entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// Requirement id.
    #[serde(default)]
    pub id: String,
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Priority label.
    #[serde(default)]
    pub priority: String,
    /// Local insertion time.
    #[serde(default)]
    pub local_created_time: String,
}

/// The requirement knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementKb {
    /// Requirement entries.
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

/// Loads and validates the rubric from `config/test_case_rules.json`.
///
/// A missing file is [`StoreError::InputMissing`]; a rubric without usable
/// thresholds is [`EvalError::RubricIncomplete`] naming the first missing
/// field.
pub fn load_rubric(paths: &ProjectPaths) -> Result<RubricConfig> {
    let path = paths.config_path(RUBRIC_FILE);
    if !path.exists() {
        return Err(StoreError::InputMissing {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| StoreError::ReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let rubric: RubricConfig =
        serde_json::from_str(&content).map_err(|e| StoreError::InputMalformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    if rubric.title_max_length == 0 {
        return Err(EvalError::RubricIncomplete {
            field: "title_max_length".to_string(),
        }
        .into());
    }
    if rubric.max_steps == 0 {
        return Err(EvalError::RubricIncomplete {
            field: "max_steps".to_string(),
        }
        .into());
    }
    if rubric.priority_ratios.is_empty() {
        return Err(EvalError::RubricIncomplete {
            field: "priority_ratios".to_string(),
        }
        .into());
    }
    Ok(rubric)
}

/// Loads the requirement knowledge base from
/// `config/require_list_config.json`.
///
/// A missing file yields an empty knowledge base; evaluation still works,
/// the prompt just carries no requirement context.
pub fn load_knowledge(paths: &ProjectPaths) -> Result<RequirementKb> {
    let path = paths.config_path(KNOWLEDGE_FILE);
    if !path.exists() {
        return Ok(RequirementKb::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| StoreError::ReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| {
        StoreError::InputMalformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
