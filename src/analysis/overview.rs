//! LLM-generated project overview.
//!
//! Serializes a time-filtered slice of the dataset and asks the chat model
//! for a short digest, staying inside a total token budget. Slices that do
//! not fit are partitioned into groups that each fit, each group summarized
//! into a bounded paragraph, and the paragraphs summarized once more.

use chrono::{NaiveDate, NaiveDateTime};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, CallOptions};
use crate::error::Result;
use crate::extract::canonical_text;
use crate::model::{IssueDataset, IssueKind};
use crate::token::{TokenCounter, batching};

/// Default total token budget.
pub const DEFAULT_BUDGET: usize = 12_000;

/// Tokens reserved for the model's final answer.
const EXPECTED_RESPONSE_TOKENS: usize = 1_024;

/// Completion budget for one group paragraph.
const GROUP_SUMMARY_TOKENS: u32 = 512;

/// Instruction for the single-shot and final summarization calls.
const DIGEST_PROMPT: &str = "你是项目分析助手。请基于以下项目数据，生成一段简短的项目概览，\
覆盖需求进展、缺陷状况和值得关注的风险，控制在300字以内。\n\n";

/// Instruction for one group's bounded paragraph.
const GROUP_PROMPT: &str = "你是项目分析助手。请把以下项目数据压缩成一段事实性的摘要段落，\
保留数量、状态和优先级信息，控制在150字以内。\n\n";

/// Overview options.
#[derive(Debug, Clone, Default)]
pub struct OverviewOptions {
    /// Inclusive range start over created-at.
    pub since: Option<NaiveDate>,
    /// Inclusive range end over created-at.
    pub until: Option<NaiveDate>,
    /// Total token budget (defaults to [`DEFAULT_BUDGET`] when zero).
    pub budget: usize,
    /// Provider call overrides.
    pub call: CallOptions,
}

/// Overview result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OverviewResult {
    /// The digest text (empty for an empty slice).
    pub digest: String,
    /// Stories inside the range.
    pub stories_considered: usize,
    /// Bugs inside the range.
    pub bugs_considered: usize,
    /// Number of groups the slice was split into.
    pub groups: usize,
}

/// Generates the overview digest.
///
/// An empty filtered slice returns successfully with zero counts and no LLM
/// call. Partitioning is deterministic for a fixed budget and input order.
pub async fn generate_overview(
    dataset: &IssueDataset,
    options: &OverviewOptions,
    client: &ApiClient,
    counter: &TokenCounter,
    cancel: &CancellationToken,
) -> Result<OverviewResult> {
    let budget = if options.budget == 0 {
        DEFAULT_BUDGET
    } else {
        options.budget
    };

    let (texts, stories, bugs) = filter_slice(dataset, options.since, options.until);
    if texts.is_empty() {
        return Ok(OverviewResult {
            digest: String::new(),
            stories_considered: 0,
            bugs_considered: 0,
            groups: 0,
        });
    }

    let overhead = counter.count(DIGEST_PROMPT);
    let available = budget
        .saturating_sub(overhead)
        .saturating_sub(EXPECTED_RESPONSE_TOKENS)
        .max(1);

    let total: usize = texts.iter().map(|t| counter.count(t)).sum();
    let call_options = CallOptions {
        max_tokens: Some(u32::try_from(EXPECTED_RESPONSE_TOKENS).unwrap_or(u32::MAX)),
        ..options.call.clone()
    };

    if total <= available {
        let prompt = format!("{DIGEST_PROMPT}{}", texts.join("\n"));
        let digest = client.call(&prompt, &call_options, cancel).await?;
        return Ok(OverviewResult {
            digest,
            stories_considered: stories,
            bugs_considered: bugs,
            groups: 1,
        });
    }

    // Too large for one call: summarize fitting groups, then the summaries.
    let batches = batching::split_all(&texts, |t| counter.count(t), available);
    tracing::info!(
        records = texts.len(),
        groups = batches.len(),
        total_tokens = total,
        "overview slice exceeds budget, summarizing per group"
    );

    let group_options = CallOptions {
        max_tokens: Some(GROUP_SUMMARY_TOKENS),
        ..options.call.clone()
    };
    let mut paragraphs = Vec::with_capacity(batches.len());
    for batch in &batches {
        let prompt = format!("{GROUP_PROMPT}{}", texts[batch.range.clone()].join("\n"));
        let paragraph = client.call(&prompt, &group_options, cancel).await?;
        paragraphs.push(paragraph);
    }

    let final_prompt = format!("{DIGEST_PROMPT}{}", paragraphs.join("\n\n"));
    let digest = client.call(&final_prompt, &call_options, cancel).await?;

    Ok(OverviewResult {
        digest,
        stories_considered: stories,
        bugs_considered: bugs,
        groups: batches.len(),
    })
}

/// Filters the dataset by created-at and serializes each kept record.
///
/// With no range bounds, every record is kept. With bounds, records whose
/// created-at is missing or unparseable are excluded.
fn filter_slice(
    dataset: &IssueDataset,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> (Vec<String>, usize, usize) {
    let mut texts = Vec::new();
    let mut stories = 0usize;
    let mut bugs = 0usize;

    for record in dataset.records() {
        if !within_range(record.created(), since, until) {
            continue;
        }
        match record.kind() {
            IssueKind::Story => stories += 1,
            IssueKind::Bug => bugs += 1,
        }
        texts.push(canonical_text(&record));
    }
    (texts, stories, bugs)
}

fn within_range(created: &str, since: Option<NaiveDate>, until: Option<NaiveDate>) -> bool {
    if since.is_none() && until.is_none() {
        return true;
    }
    let Some(date) = parse_created(created) else {
        return false;
    };
    if let Some(since) = since
        && date < since
    {
        return false;
    }
    if let Some(until) = until
        && date > until
    {
        return false;
    }
    true
}

fn parse_created(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .ok()
}
