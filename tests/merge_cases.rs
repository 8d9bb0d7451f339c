use pdf_content_extractor::{Grid, MergedCell, detect_merged_cells, normalize_grid};
use pretty_assertions::assert_eq;

fn grid(rows: &[&[Option<&str>]]) -> Grid {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.map(str::to_string)).collect())
        .collect()
}

fn cell(row: usize, col: usize, rowspan: usize, colspan: usize) -> MergedCell {
    MergedCell {
        row,
        col,
        rowspan,
        colspan,
    }
}

#[test]
fn empty_grid_has_no_merges() {
    assert!(detect_merged_cells(&[]).is_empty());
    assert!(detect_merged_cells(&grid(&[&[], &[]])).is_empty());
}

#[test]
fn grid_without_content_has_no_merges() {
    let blank = grid(&[&[None, Some(""), Some("  ")], &[Some(""), None, None]]);
    assert!(detect_merged_cells(&blank).is_empty());
}

#[test]
fn distinct_full_rows_have_no_merges() {
    let plain = grid(&[&[Some("A"), Some("B")], &[Some("C"), Some("D")]]);
    assert!(detect_merged_cells(&plain).is_empty());
}

#[test]
fn trailing_empty_cells_widen_the_anchor() {
    let header = grid(&[&[Some("A"), Some(""), Some("")]]);
    assert_eq!(detect_merged_cells(&header), vec![cell(0, 0, 1, 3)]);
}

#[test]
fn repeated_values_below_extend_rowspan() {
    let column = grid(&[&[Some("A")], &[Some("A")], &[Some("B")]]);
    assert_eq!(detect_merged_cells(&column), vec![cell(0, 0, 2, 1)]);
}

#[test]
fn rowspan_and_colspan_combine() {
    let block = grid(&[&[Some("X"), None], &[Some("X"), Some("Y")]]);
    assert_eq!(detect_merged_cells(&block), vec![cell(0, 0, 2, 2)]);
}

#[test]
fn spans_are_reported_in_row_major_order() {
    let sheet = grid(&[
        &[Some("Year"), Some("Sales"), None, Some("Notes")],
        &[Some("2023"), Some("10"), Some("12"), Some("ok")],
        &[Some("2023"), Some("11"), Some("13"), Some("ok")],
    ]);
    assert_eq!(
        detect_merged_cells(&sheet),
        vec![cell(0, 1, 1, 2), cell(1, 0, 2, 1), cell(1, 3, 2, 1)]
    );
}

#[test]
fn equal_two_by_two_block_yields_two_rowspans() {
    let block = grid(&[&[Some("A"), Some("A")], &[Some("A"), Some("A")]]);
    assert_eq!(
        detect_merged_cells(&block),
        vec![cell(0, 0, 2, 1), cell(0, 1, 2, 1)]
    );
}

#[test]
fn span_width_follows_the_anchor_row_not_shorter_rows_below() {
    let ragged = grid(&[
        &[Some("A"), None, None, None],
        &[Some("A")],
        &[],
        &[Some("B"), Some("C")],
    ]);
    assert_eq!(detect_merged_cells(&ragged), vec![cell(0, 0, 2, 4)]);
}

#[test]
fn detection_is_deterministic() {
    let sheet = grid(&[
        &[Some("H"), None, Some("I")],
        &[Some("H"), Some("J"), Some("I")],
    ]);
    assert_eq!(detect_merged_cells(&sheet), detect_merged_cells(&sheet));
}

#[test]
fn spans_stay_inside_the_grid() {
    let sheet = grid(&[
        &[Some("A"), None, None],
        &[Some("B"), Some("C")],
        &[Some("B"), Some("C"), None],
    ]);
    let merged = detect_merged_cells(&sheet);
    for span in &merged {
        assert!(span.rowspan >= 1 && span.colspan >= 1);
        assert!(span.rowspan > 1 || span.colspan > 1);
        assert!(span.row + span.rowspan <= sheet.len());
        assert!(span.col + span.colspan <= sheet[span.row].len());
    }
}

#[test]
fn normalized_rows_keep_positions() {
    let sheet = grid(&[&[Some(" A "), None, Some("B")]]);
    assert_eq!(normalize_grid(&sheet), vec![vec!["A", "", "B"]]);
}
