//! Markdown renderings of extracted content.

use std::collections::BTreeMap;

use super::Workbook;

/// Render every sheet as a heading followed by a pipe table. The separator row after the
/// first row is sized to that row.
pub fn spreadsheet_markdown(workbook: &Workbook) -> String {
    let mut markdown = String::new();
    for sheet in &workbook.sheets {
        markdown.push_str(&format!("# {}\n\n", sheet.name));
        for (index, row) in sheet.rows.iter().enumerate() {
            markdown.push_str("| ");
            for cell in row {
                markdown.push_str(cell);
                markdown.push_str(" | ");
            }
            markdown.push('\n');
            if index == 0 {
                markdown.push_str("| ");
                markdown.push_str(&"--- | ".repeat(row.len()));
                markdown.push('\n');
            }
        }
        markdown.push('\n');
    }
    markdown
}

/// Render OCR output with an optional field list and the raw text in a fenced block.
pub fn document_markdown(text: &str, key_values: &BTreeMap<String, String>) -> String {
    let mut markdown = String::from("# Document\n\n");
    if !key_values.is_empty() {
        markdown.push_str("## Fields\n\n");
        for (key, value) in key_values {
            markdown.push_str(&format!("- **{key}**: {value}\n"));
        }
        markdown.push('\n');
    }
    markdown.push_str("## Content\n\n```\n");
    markdown.push_str(text);
    markdown.push_str("\n```\n");
    markdown
}
