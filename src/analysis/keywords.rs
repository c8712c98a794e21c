//! Keyword extraction over issue text.
//!
//! Tokenization is CJK-aware without a dictionary: Han-script runs are split
//! into overlapping two-character terms (three- and four-character runs are
//! also kept whole), Latin and digit tokens pass through whole (lowercased).
//! A curated stop-list removes function words while keeping domain
//! vocabulary (缺陷, 需求, 模块, 用户, 测试, ...).

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::model::{IssueDataset, IssueRecord};
use crate::token::is_cjk;

/// Which record fields contribute text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldScope {
    /// Title/name and description only.
    Core,
    /// Core plus status, priority, people, iteration, and severity.
    Extended,
}

/// A token with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenCount {
    /// The token text.
    pub token: String,
    /// Number of occurrences across the selected fields.
    pub count: usize,
}

/// Keyword analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct KeywordReport {
    /// Total tokens kept after filtering.
    pub total_tokens: usize,
    /// Distinct tokens kept after filtering.
    pub unique_tokens: usize,
    /// Tokens with count >= the requested minimum frequency.
    pub high_frequency_tokens: Vec<TokenCount>,
    /// Token counts binned by frequency band.
    pub frequency_distribution: BTreeMap<&'static str, usize>,
    /// The twenty most frequent tokens.
    pub top_20_tokens: Vec<TokenCount>,
    /// Category label -> high-frequency tokens matching its vocabulary.
    pub category_keywords: BTreeMap<&'static str, Vec<String>>,
}

/// Frequency bands for the distribution summary.
const FREQUENCY_BINS: [(&str, usize, usize); 6] = [
    ("100+", 100, usize::MAX),
    ("50-99", 50, 99),
    ("20-49", 20, 49),
    ("10-19", 10, 19),
    ("5-9", 5, 9),
    ("1-4", 1, 4),
];

/// Fixed category vocabulary. A high-frequency token lands in a category
/// when it matches one of the literal terms (either direction of
/// containment, so 分页 matches a 页面 category only via an exact term).
const CATEGORIES: [(&str, &[&str]); 6] = [
    ("功能需求", &["功能", "需求", "特性", "支持", "新增", "feature"]),
    ("界面显示", &["界面", "页面", "显示", "样式", "布局", "ui"]),
    ("数据处理", &["数据", "字段", "导出", "导入", "存储", "同步"]),
    ("性能体验", &["性能", "超时", "缓慢", "卡顿", "加载", "响应"]),
    ("异常缺陷", &["异常", "错误", "缺陷", "失败", "崩溃", "闪退", "bug"]),
    ("测试验证", &["测试", "用例", "验证", "回归", "自动化"]),
];

/// Function words dropped during tokenization. Deliberately excludes domain
/// terms (缺陷, 需求, 模块, 用户, 测试, defect, module, ...).
const STOP_WORDS: [&str; 59] = [
    "的", "了", "在", "是", "和", "与", "或", "及", "就", "都", "也", "很",
    "会", "要", "去", "说", "看", "这", "那", "有", "没", "不", "我", "你",
    "他", "她", "它", "们", "被", "把", "让", "向", "对", "从", "到", "为",
    "于", "而", "且", "并", "则", "给", "该", "此", "其", "进行", "可以",
    "需要", "the", "a", "an", "and", "or", "of", "to", "in", "for", "with",
    "is",
];

/// Analyzes keyword frequencies over the dataset.
///
/// Running twice with the same parameters returns identical counts; all
/// intermediate maps are ordered.
#[must_use]
pub fn analyze_keywords(
    dataset: &IssueDataset,
    scope: FieldScope,
    min_frequency: usize,
) -> KeywordReport {
    let records = dataset.records();
    let counts: BTreeMap<String, usize> = records
        .par_iter()
        .map(|record| {
            let mut local: BTreeMap<String, usize> = BTreeMap::new();
            for token in tokenize(&record_text(record, scope)) {
                *local.entry(token).or_insert(0) += 1;
            }
            local
        })
        .reduce(BTreeMap::new, |mut acc, local| {
            for (token, count) in local {
                *acc.entry(token).or_insert(0) += count;
            }
            acc
        });

    let total_tokens: usize = counts.values().sum();
    let unique_tokens = counts.len();

    let mut frequency_distribution: BTreeMap<&'static str, usize> =
        FREQUENCY_BINS.iter().map(|(label, _, _)| (*label, 0)).collect();
    for &count in counts.values() {
        if let Some(&(label, _, _)) = FREQUENCY_BINS
            .iter()
            .find(|(_, lo, hi)| count >= *lo && count <= *hi)
        {
            *frequency_distribution.entry(label).or_insert(0) += 1;
        }
    }

    // Sort by count descending, then token ascending for a stable order.
    let mut ranked: Vec<TokenCount> = counts
        .into_iter()
        .map(|(token, count)| TokenCount { token, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.token.cmp(&b.token)));

    let min_frequency = min_frequency.max(1);
    let high_frequency_tokens: Vec<TokenCount> = ranked
        .iter()
        .filter(|tc| tc.count >= min_frequency)
        .cloned()
        .collect();

    let top_20_tokens: Vec<TokenCount> = ranked.iter().take(20).cloned().collect();

    let mut category_keywords: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    for (label, vocabulary) in CATEGORIES {
        let matches: Vec<String> = high_frequency_tokens
            .iter()
            .filter(|tc| {
                vocabulary
                    .iter()
                    .any(|term| tc.token.contains(term) || term.contains(tc.token.as_str()))
            })
            .map(|tc| tc.token.clone())
            .collect();
        category_keywords.insert(label, matches);
    }

    KeywordReport {
        total_tokens,
        unique_tokens,
        high_frequency_tokens,
        frequency_distribution,
        top_20_tokens,
        category_keywords,
    }
}

/// Concatenates the selected fields of a record.
fn record_text(record: &IssueRecord<'_>, scope: FieldScope) -> String {
    let mut parts: Vec<&str> = vec![record.title()];
    match record {
        IssueRecord::Story(story) => {
            parts.push(&story.description);
            if scope == FieldScope::Extended {
                parts.extend([
                    story.status.as_str(),
                    story.priority.as_str(),
                    story.creator.as_str(),
                    story.iteration_id.as_str(),
                ]);
            }
        }
        IssueRecord::Bug(bug) => {
            parts.push(&bug.description);
            if scope == FieldScope::Extended {
                parts.extend([
                    bug.status.as_str(),
                    bug.priority.as_str(),
                    bug.severity.as_str(),
                    bug.reporter.as_str(),
                ]);
            }
        }
    }
    parts.join(" ")
}

/// Tokenizes text into filtered terms.
///
/// Consecutive Han characters are collected into runs and emitted as
/// overlapping two-character terms (UAX#29 would put a boundary between
/// every ideograph, which is useless for keywords); runs of three or four
/// characters are additionally emitted whole. Everything between runs goes
/// through `unicode_words` and is lowercased. Single characters, pure
/// digits, and stop words are dropped.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut run: Vec<char> = Vec::new();
    let mut latin = String::new();

    for c in text.chars() {
        if is_cjk(c) {
            flush_latin(&mut tokens, &mut latin);
            run.push(c);
        } else {
            flush_run(&mut tokens, &run);
            run.clear();
            latin.push(c);
        }
    }
    flush_run(&mut tokens, &run);
    flush_latin(&mut tokens, &mut latin);
    tokens
}

/// Emits the word tokens of a buffered non-Han fragment.
fn flush_latin(tokens: &mut Vec<String>, buffer: &mut String) {
    if buffer.is_empty() {
        return;
    }
    for word in buffer.unicode_words() {
        push_token(tokens, &word.to_lowercase());
    }
    buffer.clear();
}

/// Emits the overlapping bigrams of a Han run, plus the whole run for
/// three- and four-character runs (short runs are usually one compound
/// term, e.g. 兼容性 or 自动化测试 components).
fn flush_run(tokens: &mut Vec<String>, run: &[char]) {
    if run.len() < 2 {
        // Single ideographs carry too little signal; the single-character
        // filter would drop them anyway.
        return;
    }
    for pair in run.windows(2) {
        push_token(tokens, &pair.iter().collect::<String>());
    }
    if (3..=4).contains(&run.len()) {
        push_token(tokens, &run.iter().collect::<String>());
    }
}

fn push_token(tokens: &mut Vec<String>, token: &str) {
    if token.chars().count() <= 1 {
        return;
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        return;
    }
    if STOP_WORDS.contains(&token) {
        return;
    }
    tokens.push(token.to_string());
}
