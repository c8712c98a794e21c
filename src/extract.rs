//! Canonical text projection for issue records.
//!
//! Every record is flattened to one searchable string before embedding.
//! Field order is fixed per kind so that rebuilding an index over the same
//! dataset reproduces the same chunk texts.

use crate::model::{Bug, IssueRecord, Story};

/// Separator between fields in the canonical string.
const FIELD_SEP: &str = " | ";

/// Projects a record to its canonical searchable string.
///
/// Non-empty fields are emitted in a fixed order per kind, `label value`
/// pairs joined with `" | "`, always ending with `type:` and `id:` markers.
///
/// # Examples
///
/// ```
/// use issuelens::extract::canonical_text;
/// use issuelens::model::{IssueRecord, Story};
///
/// let story = Story {
///     id: "1001".to_string(),
///     name: "订单列表分页".to_string(),
///     ..Default::default()
/// };
/// let text = canonical_text(&IssueRecord::Story(&story));
/// assert_eq!(text, "name 订单列表分页 | type: story | id: 1001");
/// ```
#[must_use]
pub fn canonical_text(record: &IssueRecord<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();

    match record {
        IssueRecord::Story(story) => push_story_fields(&mut parts, story),
        IssueRecord::Bug(bug) => push_bug_fields(&mut parts, bug),
    }

    parts.push(format!("type: {}", record.kind()));
    parts.push(format!("id: {}", record.id()));
    parts.join(FIELD_SEP)
}

fn push_story_fields(parts: &mut Vec<String>, story: &Story) {
    push(parts, "name", &story.name);
    push(parts, "description", &story.description);
    push(parts, "status", &story.status);
    push(parts, "priority", &story.priority);
    push(parts, "creator", &story.creator);
    push(parts, "iteration", &story.iteration_id);
    push(parts, "created", &story.created);
    push(parts, "modified", &story.modified);
}

fn push_bug_fields(parts: &mut Vec<String>, bug: &Bug) {
    push(parts, "title", &bug.title);
    push(parts, "description", &bug.description);
    push(parts, "priority", &bug.priority);
    push(parts, "severity", &bug.severity);
    push(parts, "status", &bug.status);
    push(parts, "reporter", &bug.reporter);
    push(parts, "regression", &bug.regression_number);
    push(parts, "created", &bug.created);
    push(parts, "modified", &bug.modified);
}

fn push(parts: &mut Vec<String>, label: &str, value: &str) {
    if !value.is_empty() {
        parts.push(format!("{label} {value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bug;

    #[test]
    fn test_story_full_projection() {
        let story = Story {
            id: "1001".to_string(),
            name: "订单列表分页".to_string(),
            description: "支持按页加载".to_string(),
            status: "planning".to_string(),
            priority: "High".to_string(),
            creator: "张三".to_string(),
            iteration_id: "it-7".to_string(),
            created: "2025-01-01 09:00:00".to_string(),
            modified: "2025-01-02 10:00:00".to_string(),
            ..Default::default()
        };

        let text = canonical_text(&IssueRecord::Story(&story));
        assert_eq!(
            text,
            "name 订单列表分页 | description 支持按页加载 | status planning | \
             priority High | creator 张三 | iteration it-7 | \
             created 2025-01-01 09:00:00 | modified 2025-01-02 10:00:00 | \
             type: story | id: 1001"
        );
    }

    #[test]
    fn test_bug_field_order() {
        let bug = Bug {
            id: "2001".to_string(),
            title: "支付回调超时".to_string(),
            priority: "urgent".to_string(),
            severity: "serious".to_string(),
            status: "open".to_string(),
            reporter: "李四".to_string(),
            ..Default::default()
        };

        let text = canonical_text(&IssueRecord::Bug(&bug));
        assert_eq!(
            text,
            "title 支付回调超时 | priority urgent | severity serious | \
             status open | reporter 李四 | type: bug | id: 2001"
        );
    }

    #[test]
    fn test_empty_fields_skipped() {
        let story = Story {
            id: "1".to_string(),
            name: "n".to_string(),
            ..Default::default()
        };
        let text = canonical_text(&IssueRecord::Story(&story));
        assert_eq!(text, "name n | type: story | id: 1");
        assert!(!text.contains("description"));
    }

    #[test]
    fn test_type_and_id_always_present() {
        let bug = Bug::default();
        let text = canonical_text(&IssueRecord::Bug(&bug));
        assert_eq!(text, "type: bug | id: ");
    }
}
