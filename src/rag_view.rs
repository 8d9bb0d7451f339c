use serde::{Deserialize, Serialize};

use crate::model::PageContent;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagTable {
    pub document_path: String,
    pub page_number: u32,
    pub table_id: String,
    pub markdown: String,
}

/// Retrieval-oriented view of an extraction: page-annotated text plus markdown tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagView {
    pub raw_text: String,
    pub tables: Vec<RagTable>,
}

fn markdown_cell(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

fn markdown_row(cells: &[String], width: usize) -> String {
    let mut line = String::from("|");
    for index in 0..width {
        let cell = cells.get(index).map_or(String::new(), |cell| markdown_cell(cell));
        line.push(' ');
        line.push_str(&cell);
        line.push_str(" |");
    }
    line
}

/// Renders rows as a pipe table, treating the first row as the header.
#[must_use]
pub fn rows_to_markdown(rows: &[Vec<String>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let Some((header, body)) = rows.split_first() else {
        return String::new();
    };
    if width == 0 {
        return String::new();
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(markdown_row(header, width));
    lines.push(format!("|{}", " --- |".repeat(width)));
    lines.extend(body.iter().map(|row| markdown_row(row, width)));
    lines.join("\n")
}

#[must_use]
pub fn build_rag_view(pages: &[PageContent], document_path: &str) -> RagView {
    let mut raw_text_parts = Vec::new();
    let mut tables = Vec::new();

    for page in pages {
        let page_text = page.text.as_deref().unwrap_or_default().trim();
        if !page_text.is_empty() {
            raw_text_parts.push(format!("[PAGE {}]\n{page_text}", page.page_number));
        }

        tables.extend(page.tables.iter().map(|table| RagTable {
            document_path: document_path.to_string(),
            page_number: page.page_number,
            table_id: table.table_id.clone(),
            markdown: rows_to_markdown(&table.structure.rows),
        }));
    }

    RagView {
        raw_text: raw_text_parts.join("\n\n").trim().to_string(),
        tables,
    }
}
