//! Markdown table extraction.
//!
//! LLM replies embed pipe tables; this module pulls every table out of a
//! reply as headers plus data rows. Kept generic so other reply formats can
//! reuse it.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// One parsed pipe table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Header cells.
    pub headers: Vec<String>,
    /// Data rows (header and separator rows excluded).
    pub rows: Vec<Vec<String>>,
}

/// Parses all Markdown tables in `text`, in document order.
///
/// Non-table content is ignored. Malformed pipe syntax that the parser does
/// not recognize as a table yields no entry rather than an error.
#[must_use]
pub fn parse_tables(text: &str) -> Vec<Table> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(text, options);

    let mut tables = Vec::new();
    let mut current: Option<Table> = None;
    let mut in_cell = false;
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();

    for event in parser {
        match event {
            Event::Start(Tag::Table(_)) => {
                current = Some(Table {
                    headers: Vec::new(),
                    rows: Vec::new(),
                });
            }
            Event::End(TagEnd::Table) => {
                if let Some(table) = current.take() {
                    tables.push(table);
                }
            }
            Event::Start(Tag::TableHead) => row.clear(),
            Event::End(TagEnd::TableHead) => {
                if let Some(table) = current.as_mut() {
                    table.headers = std::mem::take(&mut row);
                }
            }
            Event::Start(Tag::TableRow) => row.clear(),
            Event::End(TagEnd::TableRow) => {
                if let Some(table) = current.as_mut() {
                    table.rows.push(std::mem::take(&mut row));
                }
            }
            Event::Start(Tag::TableCell) => {
                in_cell = true;
                cell.clear();
            }
            Event::End(TagEnd::TableCell) => {
                in_cell = false;
                row.push(cell.trim().to_string());
            }
            Event::Text(text) | Event::Code(text) if in_cell => cell.push_str(&text),
            _ => {}
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "\
### 用例ID: TC-1\n\n\
| 内容 | 评分(0-10) | 建议 |\n\
| --- | --- | --- |\n\
| 用例标题 | 8 | 补充模块前缀 |\n\
| 前置条件 | 6 | 说明登录状态 |\n\
| 步骤描述 | 9 | 无 |\n\
| 预期结果 | 7 | 增加断言细节 |\n";

    #[test]
    fn test_parse_single_table() {
        let tables = parse_tables(REPLY);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.headers, vec!["内容", "评分(0-10)", "建议"]);
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[0], vec!["用例标题", "8", "补充模块前缀"]);
        assert_eq!(table.rows[3], vec!["预期结果", "7", "增加断言细节"]);
    }

    #[test]
    fn test_parse_multiple_tables() {
        let text = format!("{REPLY}\n### 用例ID: TC-2\n\n{}", REPLY.lines().skip(2).collect::<Vec<_>>().join("\n"));
        let tables = parse_tables(&text);
        assert_eq!(tables.len(), 2);
    }

    #[test]
    fn test_no_table_returns_empty() {
        assert!(parse_tables("这条回复没有表格，只有普通文本。").is_empty());
        assert!(parse_tables("").is_empty());
    }

    #[test]
    fn test_inline_code_kept_in_cells() {
        let text = "\
| 内容 | 评分(0-10) | 建议 |\n\
| --- | --- | --- |\n\
| 步骤描述 | 5 | 使用 `setup()` 初始化 |\n";
        let tables = parse_tables(text);
        assert_eq!(tables[0].rows[0][2], "使用 setup() 初始化");
    }

    #[test]
    fn test_four_column_rows() {
        let text = "\
| 字段 | 内容 | 评分(0-10) | 建议 |\n\
| --- | --- | --- | --- |\n\
| 用例标题 | 登录成功 | 8 | 无 |\n";
        let tables = parse_tables(text);
        assert_eq!(tables[0].headers.len(), 4);
        assert_eq!(tables[0].rows[0].len(), 4);
    }
}
