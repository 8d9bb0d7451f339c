use crate::model::MergedCell;

fn is_empty_cell(cell: Option<&str>) -> bool {
    cell.is_none_or(|value| value.trim().is_empty())
}

fn colspan_at(row: &[Option<String>], col: usize) -> usize {
    1 + row
        .iter()
        .skip(col + 1)
        .take_while(|cell| is_empty_cell(cell.as_deref()))
        .count()
}

fn rowspan_at(grid: &[Vec<Option<String>>], row: usize, col: usize, anchor: &str) -> usize {
    1 + grid
        .iter()
        .skip(row + 1)
        .take_while(|next_row| matches!(next_row.get(col), Some(Some(value)) if value == anchor))
        .count()
}

/// Infers merged cells from a grid of extracted cell values.
///
/// Horizontal merges are signalled by empty cells to the right of a
/// content-bearing anchor; vertical merges by the anchor's exact value
/// repeating in the rows directly below it. Spans are returned in row-major
/// discovery order and every grid position is attributed at most once.
#[must_use]
pub fn detect_merged_cells(grid: &[Vec<Option<String>>]) -> Vec<MergedCell> {
    let mut merged = Vec::new();

    let num_rows = grid.len();
    let num_cols = grid.iter().map(Vec::len).max().unwrap_or(0);
    if num_rows == 0 || num_cols == 0 {
        return merged;
    }

    let mut processed = vec![vec![false; num_cols]; num_rows];

    for (row_idx, row) in grid.iter().enumerate() {
        for col_idx in 0..num_cols {
            if processed[row_idx][col_idx] {
                continue;
            }

            let Some(cell) = row.get(col_idx) else {
                processed[row_idx][col_idx] = true;
                continue;
            };
            let Some(value) = cell.as_deref().filter(|value| !is_empty_cell(Some(value))) else {
                processed[row_idx][col_idx] = true;
                continue;
            };

            let colspan = colspan_at(row, col_idx);
            let rowspan = rowspan_at(grid, row_idx, col_idx, value);

            if rowspan > 1 || colspan > 1 {
                merged.push(MergedCell {
                    row: row_idx,
                    col: col_idx,
                    rowspan,
                    colspan,
                });

                for marked_row in processed.iter_mut().skip(row_idx).take(rowspan) {
                    for marked in marked_row.iter_mut().skip(col_idx).take(colspan) {
                        *marked = true;
                    }
                }
            } else {
                processed[row_idx][col_idx] = true;
            }
        }
    }

    merged
}
