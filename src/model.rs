use serde::{Deserialize, Serialize};

/// Logical table grid as produced by table detection; `None` marks an absent cell.
pub type Grid = Vec<Vec<Option<String>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTable {
    pub page: u32,
    pub grid: Grid,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MergedCell {
    pub row: usize,
    pub col: usize,
    pub rowspan: usize,
    pub colspan: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableStructure {
    pub rows: Vec<Vec<String>>,
    pub merged_cells: Vec<MergedCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableContent {
    pub table_id: String,
    pub structure: TableStructure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageContent {
    pub image_id: String,
    pub description: String,
    pub ocr_text: Option<String>,
}

/// One page of extraction output. Field order is part of the output schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageContent {
    pub page_number: u32,
    pub text: Option<String>,
    pub tables: Vec<TableContent>,
    pub images: Vec<ImageContent>,
}

#[must_use]
pub fn table_id(page: u32, index: usize) -> String {
    format!("table_p{page}_t{index}")
}

#[must_use]
pub fn image_id(page: u32, index: usize) -> String {
    format!("image_p{page}_i{index}")
}
