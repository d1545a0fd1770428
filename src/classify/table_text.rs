//! Tabular structure hidden in plain text
//!
//! Some documents (and most PDF conversions) carry tables as lines of text
//! separated by tabs, pipes, commas or runs of spaces. This module turns such
//! a block back into a grid.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Lines shorter than this never take part in fixed-width detection
const FIXED_WIDTH_MIN_LINE: usize = 21;

/// Rectangular grid of cell texts; every row has `column_count` cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextGrid {
    rows: Vec<Vec<String>>,
    column_count: usize,
}

impl TextGrid {
    /// Build a grid, cutting rows to `column_count` and padding short rows
    fn new(rows: Vec<Vec<String>>, column_count: usize) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.truncate(column_count);
                row.resize(column_count, String::new());
                row
            })
            .collect();
        Self { rows, column_count }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Tab,
    Pipe,
    Comma,
    SpaceRun,
}

const DELIMITERS: [Delimiter; 4] = [
    Delimiter::Tab,
    Delimiter::Pipe,
    Delimiter::Comma,
    Delimiter::SpaceRun,
];

impl Delimiter {
    fn split(self, line: &str) -> Vec<String> {
        let line = line.trim();
        let fields: Vec<&str> = match self {
            Delimiter::Tab => line.split('\t').collect(),
            Delimiter::Pipe => line.split('|').collect(),
            Delimiter::Comma => line.split(',').collect(),
            Delimiter::SpaceRun => SPACE_RUN.split(line).collect(),
        };

        fields
            .into_iter()
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// True when the text has at least two non-empty lines
pub fn is_multiline(text: &str) -> bool {
    text.split('\n').filter(|line| !line.trim().is_empty()).count() >= 2
}

/// Try to read a block of text as a table
///
/// Delimiters are tried in order (tab, pipe, comma, runs of two or more
/// spaces). A delimiter is accepted when the lines show at most two distinct
/// field counts and the most common count is at least two. Failing that,
/// columns of spaces shared by every line are used as cut points.
pub fn detect_table_from_text(text: &str) -> Option<TextGrid> {
    let lines: Vec<&str> = text.trim().split('\n').collect();
    if lines.len() < 2 {
        return None;
    }

    DELIMITERS
        .iter()
        .find_map(|&delimiter| split_on_delimiter(&lines, delimiter))
        .or_else(|| split_fixed_width(&lines))
}

fn split_on_delimiter(lines: &[&str], delimiter: Delimiter) -> Option<TextGrid> {
    let rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| delimiter.split(line))
        .filter(|fields| !fields.is_empty())
        .collect();
    if rows.len() < 2 {
        return None;
    }

    let mut frequencies: BTreeMap<usize, usize> = BTreeMap::new();
    for row in &rows {
        *frequencies.entry(row.len()).or_default() += 1;
    }
    if frequencies.len() > 2 {
        return None;
    }

    // Ties go to the wider count so no field is cut
    let (&majority, _) = frequencies
        .iter()
        .max_by_key(|&(&count, &seen)| (seen, count))?;
    if majority < 2 {
        return None;
    }

    Some(TextGrid::new(rows, majority))
}

fn split_fixed_width(lines: &[&str]) -> Option<TextGrid> {
    let lines: Vec<Vec<char>> = lines.iter().map(|line| line.chars().collect()).collect();
    if lines.iter().any(|line| line.len() < FIXED_WIDTH_MIN_LINE) {
        return None;
    }

    let interior_spaces = |line: &Vec<char>| -> BTreeSet<usize> {
        (1..line.len().saturating_sub(1))
            .filter(|&i| line[i] == ' ')
            .collect()
    };

    let mut common = interior_spaces(&lines[0]);
    for line in &lines[1..] {
        let positions = interior_spaces(line);
        common.retain(|position| positions.contains(position));
    }
    if common.is_empty() {
        return None;
    }

    let rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| {
            let mut cells = Vec::new();
            let mut start = 0;
            for &position in &common {
                cells.push(line[start..position].iter().collect::<String>());
                start = position;
            }
            cells.push(line[start..].iter().collect::<String>());
            cells
                .into_iter()
                .map(|cell| cell.trim().to_string())
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let column_count = rows.first()?.len();
    if rows.len() < 2 || column_count < 2 {
        return None;
    }

    Some(TextGrid::new(rows, column_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_separated_lines_form_a_table() {
        let grid = detect_table_from_text("Name, Age, City\nAlice, 30, NYC\nBob, 25, LA").unwrap();
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.rows()[1], vec!["Alice", "30", "NYC"]);
    }

    #[test]
    fn tabs_win_over_commas() {
        let grid = detect_table_from_text("Item\tCost, USD\nPens\t1,20\nPaper\t4,00").unwrap();
        assert_eq!(grid.column_count(), 2);
        assert_eq!(grid.rows()[0], vec!["Item", "Cost, USD"]);
    }

    #[test]
    fn pipe_tables_ignore_outer_pipes() {
        let grid = detect_table_from_text("| a | b |\n| c | d |").unwrap();
        assert_eq!(grid.rows(), &[vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn ragged_rows_are_cut_and_padded() {
        let grid = detect_table_from_text("a|b|c\nd|e|f\ng|h|i\nj|k").unwrap();
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.rows()[3], vec!["j", "k", ""]);

        let grid = detect_table_from_text("a|b\nc|d\ne|f|extra").unwrap();
        assert_eq!(grid.column_count(), 2);
        assert_eq!(grid.rows()[2], vec!["e", "f"]);
    }

    #[test]
    fn too_many_distinct_counts_is_not_a_table() {
        assert_eq!(detect_table_from_text("a,b\nc,d,e\nf,g,h,i"), None);
    }

    #[test]
    fn space_runs_split_columns() {
        let grid = detect_table_from_text("Region   Sales\nNorth    120\nSouth    95").unwrap();
        assert_eq!(grid.column_count(), 2);
        assert_eq!(grid.rows()[2], vec!["South", "95"]);
    }

    #[test]
    fn fixed_width_columns_split_on_shared_spaces() {
        let text = "alpha-one beta-two-xy\nomega-six zeta-four-yz";
        let grid = detect_table_from_text(text).unwrap();
        assert_eq!(grid.column_count(), 2);
        assert_eq!(grid.rows()[1], vec!["omega-six", "zeta-four-yz"]);
    }

    #[test]
    fn single_line_or_prose_is_not_a_table() {
        assert_eq!(detect_table_from_text("just one line, with a comma"), None);
        assert_eq!(
            detect_table_from_text("first line of prose\nsecond line of prose"),
            None
        );
    }

    #[test]
    fn multiline_needs_two_non_empty_lines() {
        assert!(is_multiline("a\n\nb"));
        assert!(!is_multiline("a\n   \n"));
        assert!(!is_multiline("single"));
    }
}
