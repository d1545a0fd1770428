//! Table extraction
//!
//! Converts a docx-rs table into a row/cell grid where every cell keeps its
//! own paragraphs and run formatting.

use super::super::models::*;
use super::formatting::extract_paragraph_runs;

/// Extract table content from a docx-rs Table
///
/// Returns `None` for tables with no rows. Empty cells are kept so the grid
/// shape survives; empty paragraphs inside a cell are dropped. A cell spanning
/// several grid columns is followed by empty cells for the extra columns, and
/// vertically merged continuation cells stay empty.
pub(crate) fn extract_table_content(table: &docx_rs::Table) -> Option<TableContent> {
    let mut rows = Vec::with_capacity(table.rows.len());

    for table_child in &table.rows {
        let docx_rs::TableChild::TableRow(row) = table_child;
        let mut cells = Vec::with_capacity(row.cells.len());

        for row_child in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = row_child;
            let mut paragraphs = Vec::new();

            for content in &cell.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(para) => {
                        let runs = extract_paragraph_runs(para);
                        let paragraph = ParagraphContent::new(FormattedRun::consolidate_runs(runs));
                        if !paragraph.is_blank() {
                            paragraphs.push(paragraph);
                        }
                    }
                    _ => {
                        // Nested tables are flattened away
                    }
                }
            }

            cells.push(paragraphs);
            for _ in 1..grid_span(cell) {
                cells.push(Vec::new());
            }
        }

        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    if rows.is_empty() {
        None
    } else {
        Some(TableContent::new(rows))
    }
}

/// Number of grid columns a cell covers
///
/// `TableCellProperty` keeps `gridSpan` private; its serde form exposes it.
fn grid_span(cell: &docx_rs::TableCell) -> usize {
    serde_json::to_value(&cell.property)
        .ok()
        .and_then(|property| property.get("gridSpan")?.as_u64())
        .map_or(1, |span| (span as usize).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Paragraph, Run, Table, TableCell, TableRow, VMergeType};

    fn cell(text: &str) -> TableCell {
        TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
    }

    #[test]
    fn extracts_grid_shape_and_text() {
        let table = Table::new(vec![
            TableRow::new(vec![cell("Name"), cell("Age")]),
            TableRow::new(vec![cell("Alice"), cell("30")]),
        ]);
        let content = extract_table_content(&table).expect("table");
        assert_eq!(content.row_count(), 2);
        assert_eq!(content.column_count(), 2);
        assert_eq!(content.cell_text(1, 0).as_deref(), Some("Alice"));
    }

    #[test]
    fn empty_cells_keep_their_slot() {
        let table = Table::new(vec![TableRow::new(vec![
            cell("a"),
            TableCell::new().add_paragraph(Paragraph::new()),
            cell("c"),
        ])]);
        let content = extract_table_content(&table).expect("table");
        assert_eq!(content.column_count(), 3);
        assert!(content.rows[0][1].is_empty());
        assert_eq!(content.cell_text(0, 2).as_deref(), Some("c"));
    }

    #[test]
    fn spanned_cells_keep_later_columns_aligned() {
        let table = Table::new(vec![
            TableRow::new(vec![cell("Region").grid_span(2), cell("Total")]),
            TableRow::new(vec![cell("North"), cell("Q1"), cell("120")]),
        ]);
        let content = extract_table_content(&table).expect("table");
        assert_eq!(content.column_count(), 3);
        assert!(content.rows[0][1].is_empty());
        assert_eq!(content.cell_text(0, 2).as_deref(), Some("Total"));
        assert_eq!(content.cell_text(1, 2).as_deref(), Some("120"));
    }

    #[test]
    fn vertical_merge_continuation_stays_empty() {
        let table = Table::new(vec![
            TableRow::new(vec![
                cell("Owner").vertical_merge(VMergeType::Restart),
                cell("Task one"),
            ]),
            TableRow::new(vec![
                TableCell::new()
                    .add_paragraph(Paragraph::new())
                    .vertical_merge(VMergeType::Continue),
                cell("Task two"),
            ]),
        ]);
        let content = extract_table_content(&table).expect("table");
        assert!(content.rows[1][0].is_empty());
        assert_eq!(content.cell_text(1, 1).as_deref(), Some("Task two"));
    }
}
