use crate::model::{DetectedTable, PageText};
use crate::table_parse::{
    PositionedCell, align_rows, modal_width, soft_split_line_into_cells,
    split_line_into_cells_with_offsets,
};

pub(crate) const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

/// How regular a block's row widths are, in `[0, 1]`, measured on the cells
/// each line split into before column alignment.
///
/// Three quarters of the score is the share of rows at the modal width; the
/// rest penalises the spread between the narrowest and widest row.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn table_confidence<T>(rows: &[Vec<T>]) -> f32 {
    let modal = modal_width(rows);
    if rows.len() < 2 || modal == 0 {
        return 0.0;
    }

    let (min_width, max_width) = rows
        .iter()
        .map(Vec::len)
        .fold((usize::MAX, 0), |(min, max), width| (min.min(width), max.max(width)));
    let at_modal = rows.iter().filter(|row| row.len() == modal).count() as f32 / rows.len() as f32;
    // max_width >= modal > 0
    let spread = (max_width - min_width) as f32 / max_width as f32;

    (0.75 * at_modal + 0.25 * (1.0 - spread)).clamp(0.0, 1.0)
}

fn looks_like_sentence(line: &str) -> bool {
    line.trim_end().ends_with(['.', '!', '?'])
}

/// Hard cells when there are enough of them, otherwise single-space words
/// for lines that read like data rather than prose.
fn tabular_cells(line: &str, min_cols: usize) -> Vec<PositionedCell> {
    let cells = split_line_into_cells_with_offsets(line);
    if cells.len() >= min_cols || looks_like_sentence(line) {
        return cells;
    }

    let words = soft_split_line_into_cells(line);
    let has_numeric = words
        .iter()
        .any(|(_, word)| word.chars().any(|ch| ch.is_ascii_digit()));
    if words.len() >= min_cols && (has_numeric || words.len() <= 6) {
        words
    } else {
        cells
    }
}

pub(crate) fn detect_tables_in_page(page: &PageText, min_cols: usize) -> Vec<DetectedTable> {
    let mut blocks = Vec::new();
    let mut block = Vec::new();
    for cells in page.text.lines().map(|line| tabular_cells(line, min_cols)) {
        if cells.len() >= min_cols {
            block.push(cells);
        } else if !block.is_empty() {
            blocks.push(std::mem::take(&mut block));
        }
    }
    blocks.push(block);

    blocks
        .into_iter()
        .filter(|rows| rows.len() >= 2)
        .map(|rows| DetectedTable {
            page: page.page_number,
            confidence: table_confidence(&rows),
            grid: align_rows(&rows),
        })
        .collect()
}
