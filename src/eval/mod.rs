//! LLM-driven rubric evaluation of test cases.
//!
//! Cases are packed into token-bounded batches, each batch reviewed by the
//! chat model against the rubric and requirement knowledge base, and the
//! Markdown-table replies parsed into per-field scores. Batch failures are
//! recorded and later batches still run; the emitted per-case list is
//! ordered by (batch index, case index within batch).

pub mod cases;
pub mod markdown;
pub mod prompt;
pub mod rubric;

pub use cases::{CASE_COLUMNS, TestCase, load_cases};
pub use markdown::{Table, parse_tables};
pub use rubric::{
    KNOWLEDGE_FILE, PriorityRange, Requirement, RequirementKb, RUBRIC_FILE, RubricConfig,
    load_knowledge, load_rubric,
};

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, CallOptions};
use crate::config::ProjectPaths;
use crate::error::{Error, EvalError, Result};
use crate::token::{TokenCounter, batching};

/// Default LLM context-window size in tokens.
pub const DEFAULT_WINDOW: usize = 12_000;

/// Pause between batches.
const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

/// Evaluator options.
#[derive(Debug, Clone)]
pub struct EvaluatorOptions {
    /// Context-window size the budget is carved from.
    pub window: usize,
    /// Provider call overrides.
    pub call: CallOptions,
    /// Pause between batches (1 s by default).
    pub pause: Duration,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            call: CallOptions::default(),
            pause: DEFAULT_PAUSE,
        }
    }
}

/// Token budget carved out of the context window.
///
/// 25% of the window is unconditional slack. Of the remaining 75%: 25% goes
/// to the request, 50% to the response, 25% is further slack. The measured
/// static-template tokens come out of the request share, and the batch
/// threshold is 75% of what is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    /// Full window.
    pub window: usize,
    /// Tokens the response may use (passed as `max_tokens`).
    pub response_budget: usize,
    /// Greedy batch threshold for case content.
    pub batch_threshold: usize,
}

/// Computes the budget for a window and measured template size.
pub fn allocate_budget(window: usize, template_tokens: usize) -> Result<TokenBudget> {
    let usable = window * 3 / 4;
    let request_budget = usable / 4;
    let response_budget = usable / 2;

    let remaining = request_budget.saturating_sub(template_tokens);
    let batch_threshold = remaining * 3 / 4;
    if batch_threshold == 0 {
        return Err(EvalError::WindowTooSmall {
            window,
            template_tokens,
        }
        .into());
    }

    Ok(TokenBudget {
        window,
        response_budget,
        batch_threshold,
    })
}

/// Score for one reviewed field of a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldScore {
    /// Reviewed field (用例标题 / 前置条件 / 步骤描述 / 预期结果).
    pub field: String,
    /// Original content of the field.
    pub content: String,
    /// Score, 0-10.
    pub score: u8,
    /// Improvement suggestion.
    pub suggestion: String,
}

/// Evaluation of one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseEvaluation {
    /// Case id.
    pub case_id: String,
    /// Case title.
    pub title: String,
    /// Batch the case was reviewed in.
    pub batch_index: usize,
    /// Per-field scores; empty when the reply could not be parsed or the
    /// batch failed.
    pub evaluations: Vec<FieldScore>,
    /// Parse-error or provider-error note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Outcome of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// At least one case parsed.
    Parsed,
    /// The reply carried no parseable table.
    ParseError,
    /// The provider call failed.
    ApiError,
}

/// Record of one batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    /// Batch index.
    pub index: usize,
    /// Cases in the batch.
    pub case_count: usize,
    /// Estimated request tokens of the batch content.
    pub request_tokens: usize,
    /// Terminal state.
    pub outcome: BatchOutcome,
    /// Provider error, for failed batches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Share of one priority label across the case set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityShare {
    /// Cases with this label.
    pub count: usize,
    /// Share in percent.
    pub percentage: f64,
    /// Rubric minimum, when the label has a rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    /// Rubric maximum, when the label has a rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Within the rubric range.
    pub is_compliant: bool,
}

/// Priority-mix analysis against the rubric.
#[derive(Debug, Clone, Serialize)]
pub struct PriorityAnalysis {
    /// Label -> share.
    pub distribution: BTreeMap<String, PriorityShare>,
    /// All labels compliant.
    pub is_compliant: bool,
    /// Rule reference.
    pub rule: String,
}

/// Full evaluation report.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    /// Per-case evaluations, ordered by (batch index, case index).
    pub evaluations: Vec<CaseEvaluation>,
    /// Total cases evaluated.
    pub total_cases: usize,
    /// Wall-clock start.
    pub start_time: String,
    /// Wall-clock end.
    pub end_time: String,
    /// Priority-mix analysis.
    pub priority_analysis: PriorityAnalysis,
    /// Rubric snapshot the run used.
    pub rubric: RubricConfig,
    /// Per-batch records.
    pub batches: Vec<BatchRecord>,
    /// Report file location, when persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

/// Test-case evaluator.
pub struct Evaluator<'a> {
    client: &'a ApiClient,
    counter: &'a TokenCounter,
    rubric: RubricConfig,
    knowledge: RequirementKb,
    options: EvaluatorOptions,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator over a rubric and knowledge base.
    #[must_use]
    pub const fn new(
        client: &'a ApiClient,
        counter: &'a TokenCounter,
        rubric: RubricConfig,
        knowledge: RequirementKb,
        options: EvaluatorOptions,
    ) -> Self {
        Self {
            client,
            counter,
            rubric,
            knowledge,
            options,
        }
    }

    /// Evaluates the cases and returns the report.
    ///
    /// Batches run sequentially with the configured pause; a provider error
    /// marks the batch and its cases but does not stop the run. Cancellation
    /// aborts the in-flight call and fails the whole operation.
    pub async fn evaluate(
        &self,
        cases: &[TestCase],
        cancel: &CancellationToken,
    ) -> Result<EvalReport> {
        let start_time = now_string();

        let template = prompt::build_template(&self.rubric, &self.knowledge);
        let template_tokens = self.counter.count(&template);
        let budget = allocate_budget(self.options.window, template_tokens)?;

        let mut estimates = Vec::with_capacity(cases.len());
        for case in cases {
            let json = serde_json::to_string(case)?;
            estimates.push(self.counter.count(&json));
        }
        let batches = batching::split_all(&estimates, |t| *t, budget.batch_threshold);

        tracing::info!(
            cases = cases.len(),
            batches = batches.len(),
            threshold = budget.batch_threshold,
            template_tokens,
            "starting test-case evaluation"
        );

        let call_options = CallOptions {
            max_tokens: Some(u32::try_from(budget.response_budget).unwrap_or(u32::MAX)),
            ..self.options.call.clone()
        };

        let mut evaluations = Vec::with_capacity(cases.len());
        let mut records = Vec::with_capacity(batches.len());

        for (index, batch) in batches.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if index > 0 && !self.options.pause.is_zero() {
                tokio::select! {
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                    () = tokio::time::sleep(self.options.pause) => {}
                }
            }

            let slice = &cases[batch.range.clone()];
            let cases_json = serde_json::to_string_pretty(slice)?;
            let request = prompt::fill_cases(&template, &cases_json);

            match self.client.call(&request, &call_options, cancel).await {
                Ok(reply) => {
                    let parsed = parse_batch_reply(slice, &reply, index);
                    let outcome = if parsed.iter().any(|e| !e.evaluations.is_empty()) {
                        BatchOutcome::Parsed
                    } else {
                        BatchOutcome::ParseError
                    };
                    records.push(BatchRecord {
                        index,
                        case_count: slice.len(),
                        request_tokens: batch.tokens,
                        outcome,
                        error: None,
                    });
                    evaluations.extend(parsed);
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    tracing::warn!(batch = index, error = %e, "batch failed, continuing");
                    records.push(BatchRecord {
                        index,
                        case_count: slice.len(),
                        request_tokens: batch.tokens,
                        outcome: BatchOutcome::ApiError,
                        error: Some(e.to_string()),
                    });
                    evaluations.extend(slice.iter().map(|case| CaseEvaluation {
                        case_id: case.id.clone(),
                        title: case.title.clone(),
                        batch_index: index,
                        evaluations: Vec::new(),
                        note: Some(e.to_string()),
                    }));
                }
            }
        }

        Ok(EvalReport {
            evaluations,
            total_cases: cases.len(),
            start_time,
            end_time: now_string(),
            priority_analysis: analyze_priorities(cases, &self.rubric),
            rubric: self.rubric.clone(),
            batches: records,
            output_path: None,
        })
    }

    /// Evaluates and persists the report to
    /// `local_data/Proceed_TestCase_<timestamp>.json`.
    pub async fn evaluate_and_save(
        &self,
        cases: &[TestCase],
        paths: &ProjectPaths,
        cancel: &CancellationToken,
    ) -> Result<EvalReport> {
        let mut report = self.evaluate(cases, cancel).await?;

        paths.ensure_dirs()?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let path = paths.eval_output_path(&timestamp);
        crate::store::save_json(&path, &report)?;
        report.output_path = Some(path.display().to_string());
        Ok(report)
    }
}

/// Parses one batch reply into per-case evaluations.
///
/// Each case's section starts at the first occurrence of its id and runs to
/// the next case's id; the first table in the section carries the scores. A
/// case whose id or table is missing gets an empty evaluation list plus a
/// note.
fn parse_batch_reply(cases: &[TestCase], reply: &str, batch_index: usize) -> Vec<CaseEvaluation> {
    // Locate each case id; sections are delimited by the next located id.
    let mut positions: Vec<(usize, usize)> = cases
        .iter()
        .enumerate()
        .filter_map(|(i, case)| {
            if case.id.is_empty() {
                None
            } else {
                reply.find(&case.id).map(|pos| (i, pos))
            }
        })
        .collect();
    positions.sort_by_key(|(_, pos)| *pos);

    let mut sections: Vec<Option<&str>> = vec![None; cases.len()];
    for (rank, (case_index, start)) in positions.iter().enumerate() {
        let end = positions
            .get(rank + 1)
            .map_or(reply.len(), |(_, next)| *next);
        sections[*case_index] = Some(&reply[*start..end]);
    }

    cases
        .iter()
        .enumerate()
        .map(|(i, case)| {
            let Some(section) = sections[i] else {
                return CaseEvaluation {
                    case_id: case.id.clone(),
                    title: case.title.clone(),
                    batch_index,
                    evaluations: Vec::new(),
                    note: Some("用例ID未出现在回复中".to_string()),
                };
            };

            let tables = parse_tables(section);
            tables.first().map_or_else(
                || CaseEvaluation {
                    case_id: case.id.clone(),
                    title: case.title.clone(),
                    batch_index,
                    evaluations: Vec::new(),
                    note: Some("回复中缺少可解析的评审表格".to_string()),
                },
                |table| CaseEvaluation {
                    case_id: case.id.clone(),
                    title: case.title.clone(),
                    batch_index,
                    evaluations: field_scores(case, table),
                    note: None,
                },
            )
        })
        .collect()
}

/// Converts table rows into field scores.
///
/// Rows may carry four cells (field, content, score, suggestion) or three
/// (content, score, suggestion) with the field either named in the first
/// cell or implied by row order; the original field content from the case
/// fills in whenever the table omits it.
fn field_scores(case: &TestCase, table: &Table) -> Vec<FieldScore> {
    table
        .rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| match row.len() {
            0..=2 => None,
            3 => {
                let first_is_field = prompt::REVIEW_FIELDS.contains(&row[0].as_str());
                let field = if first_is_field {
                    row[0].clone()
                } else {
                    prompt::REVIEW_FIELDS
                        .get(i)
                        .map_or_else(|| format!("字段{i}"), ToString::to_string)
                };
                let content = if first_is_field {
                    case_field(case, &field)
                } else {
                    row[0].clone()
                };
                Some(FieldScore {
                    field,
                    content,
                    score: parse_score(&row[1]),
                    suggestion: row[2].clone(),
                })
            }
            _ => Some(FieldScore {
                field: row[0].clone(),
                content: row[1].clone(),
                score: parse_score(&row[2]),
                suggestion: row[3].clone(),
            }),
        })
        .collect()
}

/// Returns the case's own content for a reviewed field label.
fn case_field(case: &TestCase, field: &str) -> String {
    match field {
        "用例标题" => case.title.clone(),
        "前置条件" => case.precondition.clone(),
        "步骤描述" => case.steps.clone(),
        "预期结果" => case.expected.clone(),
        _ => String::new(),
    }
}

/// Extracts a 0-10 score from a cell; unparseable cells score 0.
fn parse_score(cell: &str) -> u8 {
    let digits: String = cell
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse::<u8>().map_or(0, |score| score.min(10))
}

/// Computes the priority distribution and rubric compliance.
///
/// Every label seen in the cases and every label named by the rubric gets a
/// share; percentages are over all cases and sum to 100 within rounding.
#[must_use]
pub fn analyze_priorities(cases: &[TestCase], rubric: &RubricConfig) -> PriorityAnalysis {
    let total = cases.len();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for case in cases {
        let label = if case.priority.is_empty() {
            "(未设置)".to_string()
        } else {
            case.priority.clone()
        };
        *counts.entry(label).or_insert(0) += 1;
    }
    for label in rubric.priority_ratios.keys() {
        counts.entry(label.clone()).or_insert(0);
    }

    #[allow(clippy::cast_precision_loss)]
    let distribution: BTreeMap<String, PriorityShare> = counts
        .into_iter()
        .map(|(label, count)| {
            let percentage = if total == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total as f64
            };
            let range = rubric.priority_ratios.get(&label);
            let is_compliant = range.is_some_and(|r| {
                percentage >= f64::from(r.min) && percentage <= f64::from(r.max)
            });
            let share = PriorityShare {
                count,
                percentage,
                min: range.map(|r| r.min),
                max: range.map(|r| r.max),
                is_compliant,
            };
            (label, share)
        })
        .collect();

    let is_compliant = distribution.values().all(|s| s.is_compliant);
    PriorityAnalysis {
        distribution,
        is_compliant,
        rule: format!("priority_ratios v{}", rubric.version),
    }
}

fn now_string() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
