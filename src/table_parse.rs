use std::collections::BTreeMap;

use crate::model::Grid;

/// A cell split out of a text line together with the character column it starts at.
pub(crate) type PositionedCell = (usize, String);

struct Word<'a> {
    column: usize,
    text: &'a str,
    /// Whitespace between the previous word and this one.
    gap: &'a str,
}

fn words(line: &str) -> Vec<Word<'_>> {
    let mut words = Vec::new();
    let mut gap_start = 0;
    let mut word_start: Option<(usize, usize)> = None;

    for (column, (byte, ch)) in line.char_indices().enumerate() {
        match (ch.is_whitespace(), word_start) {
            (true, Some((start, start_column))) => {
                words.push(Word {
                    column: start_column,
                    text: &line[start..byte],
                    gap: &line[gap_start..start],
                });
                word_start = None;
                gap_start = byte;
            }
            (false, None) => word_start = Some((byte, column)),
            _ => {}
        }
    }
    if let Some((start, column)) = word_start {
        words.push(Word {
            column,
            text: &line[start..],
            gap: &line[gap_start..start],
        });
    }
    words
}

fn group_words(line: &str, separates: impl Fn(&str) -> bool) -> Vec<PositionedCell> {
    let mut cells: Vec<PositionedCell> = Vec::new();
    for word in words(line) {
        match cells.last_mut() {
            Some((_, cell)) if !separates(word.gap) => {
                cell.push(' ');
                cell.push_str(word.text);
            }
            _ => cells.push((word.column, word.text.to_string())),
        }
    }
    cells
}

/// Cells separated by a tab or by two or more whitespace characters.
pub(crate) fn split_line_into_cells_with_offsets(line: &str) -> Vec<PositionedCell> {
    group_words(line, |gap| gap.contains('\t') || gap.chars().count() >= 2)
}

pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    split_line_into_cells_with_offsets(line)
        .into_iter()
        .map(|(_, cell)| cell)
        .collect()
}

/// Every whitespace-delimited word is its own cell.
pub(crate) fn soft_split_line_into_cells(line: &str) -> Vec<PositionedCell> {
    group_words(line, |_| true)
}

fn nearest_anchor(anchors: &[usize], offset: usize) -> usize {
    anchors
        .iter()
        .enumerate()
        .min_by_key(|(_, anchor)| anchor.abs_diff(offset))
        .map_or(0, |(index, _)| index)
}

/// Places positioned cells into columns anchored on the widest row.
///
/// A cell goes to the nearest anchor column, or the next free one to its
/// right when that slot is taken. Slots left unfilled become `None`, so every
/// row spans the full anchor width; a row is only wider when it has more
/// cells than there are anchors to its right.
pub(crate) fn align_rows(rows: &[Vec<PositionedCell>]) -> Grid {
    // `rev` so that ties on width resolve to the first widest row.
    let Some(widest) = rows.iter().rev().max_by_key(|row| row.len()) else {
        return Vec::new();
    };
    let anchors = widest.iter().map(|(offset, _)| *offset).collect::<Vec<_>>();

    rows.iter()
        .map(|row| {
            let mut slots: Vec<Option<String>> = vec![None; anchors.len()];
            for (offset, value) in row {
                let nearest = nearest_anchor(&anchors, *offset);
                match (nearest..slots.len()).find(|&index| slots[index].is_none()) {
                    Some(index) => slots[index] = Some(value.clone()),
                    None => slots.push(Some(value.clone())),
                }
            }
            slots
        })
        .collect()
}

/// Serialization view of a grid: absent cells become empty strings, values are trimmed.
#[must_use]
pub fn normalize_grid(grid: &[Vec<Option<String>>]) -> Vec<Vec<String>> {
    grid.iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_deref().map(str::trim).unwrap_or_default().to_string())
                .collect()
        })
        .collect()
}

/// Most common row width; ties go to the wider one.
pub(crate) fn modal_width<T>(rows: &[Vec<T>]) -> usize {
    rows.iter()
        .fold(BTreeMap::new(), |mut counts, row| {
            *counts.entry(row.len()).or_insert(0_usize) += 1;
            counts
        })
        .into_iter()
        .max_by_key(|&(width, count)| (count, width))
        .map_or(0, |(width, _)| width)
}

#[cfg(test)]
mod tests {
    use super::{
        align_rows, modal_width, normalize_grid, soft_split_line_into_cells,
        split_line_into_cells, split_line_into_cells_with_offsets,
    };

    #[test]
    fn wide_gaps_and_tabs_separate_cells() {
        assert_eq!(split_line_into_cells("Alice  30  98"), vec!["Alice", "30", "98"]);
        assert_eq!(split_line_into_cells("A\tB \tC"), vec!["A", "B", "C"]);
        assert!(split_line_into_cells("   ").is_empty());
    }

    #[test]
    fn keeps_single_spaces_inside_cells() {
        let cells = split_line_into_cells_with_offsets("  New York   8 336 817");
        assert_eq!(
            cells,
            vec![(2, "New York".to_string()), (13, "8 336 817".to_string())]
        );
    }

    #[test]
    fn soft_splits_single_space_cells() {
        let cells = soft_split_line_into_cells("Name Age  Score");
        assert_eq!(
            cells,
            vec![
                (0, "Name".to_string()),
                (5, "Age".to_string()),
                (10, "Score".to_string()),
            ]
        );
    }

    #[test]
    fn aligns_short_rows_against_widest_row() {
        // Rows are padded to the anchor width so trailing gaps stay visible.
        let rows = [
            "Region  Q1  Q2",
            "North   10  20",
            "            30",
            "Total",
        ]
        .iter()
        .map(|line| split_line_into_cells_with_offsets(line))
        .collect::<Vec<_>>();

        let grid = align_rows(&rows);
        assert_eq!(grid[0].len(), 3);
        assert_eq!(grid[1].len(), 3);
        assert_eq!(grid[2], vec![None, None, Some("30".to_string())]);
        assert_eq!(grid[3], vec![Some("Total".to_string()), None, None]);
    }

    #[test]
    fn normalizes_absent_cells_to_empty_strings() {
        let grid = vec![
            vec![Some(" a ".to_string()), None],
            vec![Some("b".to_string())],
        ];
        let normalized = normalize_grid(&grid);
        assert_eq!(normalized[0], vec!["a", ""]);
        assert_eq!(normalized[1], vec!["b"]);
    }

    #[test]
    fn detects_modal_width() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["1".to_string(), "2".to_string()],
            vec!["x".to_string()],
        ];
        assert_eq!(modal_width(&rows), 2);
    }
}
