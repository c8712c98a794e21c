//! Prompt template for the test-case review.
//!
//! The static part embeds the rubric thresholds and a compact rendering of
//! the requirement knowledge base; the per-batch part replaces the
//! placeholder with a JSON array of the batch's cases. The static part is
//! what the budget math measures.

use std::fmt::Write;

use crate::eval::rubric::{RequirementKb, RubricConfig};

/// Placeholder replaced per batch with the JSON case array.
pub const CASES_PLACEHOLDER: &str = "{test_cases}";

/// Table row labels the model is instructed to score, in order.
pub const REVIEW_FIELDS: [&str; 4] = ["用例标题", "前置条件", "步骤描述", "预期结果"];

/// Builds the static prompt template.
///
/// The result still contains [`CASES_PLACEHOLDER`]; use [`fill_cases`] per
/// batch.
#[must_use]
pub fn build_template(rubric: &RubricConfig, kb: &RequirementKb) -> String {
    let mut ratios = String::new();
    for (label, range) in &rubric.priority_ratios {
        let _ = write!(ratios, "{label} 占比 {}%-{}%；", range.min, range.max);
    }

    let mut knowledge = String::new();
    if kb.requirements.is_empty() {
        knowledge.push_str("（暂无需求背景）");
    } else {
        for req in &kb.requirements {
            let _ = writeln!(
                knowledge,
                "- [{}] {}（优先级 {}）：{}",
                req.id, req.title, req.priority, req.description
            );
        }
    }

    format!(
        "你是测试用例评审专家。请依据以下评审规则和需求背景，逐条评审测试用例。\n\
\n\
## 评审规则（版本 {version}）\n\
- 用例标题不超过 {title_max} 个字符，且能概括验证点\n\
- 步骤描述不超过 {max_steps} 步，每步可独立执行\n\
- 前置条件完整，预期结果可断言\n\
- 优先级分布目标：{ratios}\n\
\n\
## 需求背景\n\
{knowledge}\n\
## 待评审用例（JSON 数组）\n\
{placeholder}\n\
\n\
## 输出要求\n\
对每个用例，先输出一行 `### 用例ID: <id>`，再输出一个 Markdown 表格，\
表头为 `| 内容 | 评分(0-10) | 建议 |`，按顺序包含 {fields} 四行，\
不要输出其他内容。\n",
        version = rubric.version,
        title_max = rubric.title_max_length,
        max_steps = rubric.max_steps,
        ratios = ratios,
        knowledge = knowledge,
        placeholder = CASES_PLACEHOLDER,
        fields = REVIEW_FIELDS.join("、"),
    )
}

/// Replaces the placeholder with the batch's JSON case array.
#[must_use]
pub fn fill_cases(template: &str, cases_json: &str) -> String {
    template.replace(CASES_PLACEHOLDER, cases_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::rubric::{PriorityRange, Requirement};

    fn rubric() -> RubricConfig {
        let mut ratios = std::collections::BTreeMap::new();
        ratios.insert("P0".to_string(), PriorityRange { min: 10, max: 20 });
        ratios.insert("P1".to_string(), PriorityRange { min: 60, max: 70 });
        RubricConfig {
            title_max_length: 30,
            max_steps: 8,
            priority_ratios: ratios,
            version: "1.2".to_string(),
            last_updated: String::new(),
        }
    }

    #[test]
    fn test_template_embeds_thresholds() {
        let template = build_template(&rubric(), &RequirementKb::default());
        assert!(template.contains("30 个字符"));
        assert!(template.contains("8 步"));
        assert!(template.contains("P0 占比 10%-20%"));
        assert!(template.contains("P1 占比 60%-70%"));
        assert!(template.contains(CASES_PLACEHOLDER));
        assert!(template.contains("| 内容 | 评分(0-10) | 建议 |"));
    }

    #[test]
    fn test_template_renders_knowledge() {
        let kb = RequirementKb {
            requirements: vec![Requirement {
                id: "R-1".to_string(),
                title: "订单分页".to_string(),
                description: "支持按页加载".to_string(),
                priority: "High".to_string(),
                local_created_time: String::new(),
            }],
        };
        let template = build_template(&rubric(), &kb);
        assert!(template.contains("[R-1] 订单分页"));
        assert!(!template.contains("暂无需求背景"));
    }

    #[test]
    fn test_template_empty_knowledge_marker() {
        let template = build_template(&rubric(), &RequirementKb::default());
        assert!(template.contains("暂无需求背景"));
    }

    #[test]
    fn test_fill_cases() {
        let template = build_template(&rubric(), &RequirementKb::default());
        let filled = fill_cases(&template, r#"[{"id":"TC-1"}]"#);
        assert!(!filled.contains(CASES_PLACEHOLDER));
        assert!(filled.contains(r#"[{"id":"TC-1"}]"#));
    }
}
