//! House style for rebuilt documents
//!
//! Paragraph, table and image builders on top of the docx-rs writer. Sizes
//! are in points here and converted to the half-point / twip / EMU units
//! Word wants at the last moment.

use anyhow::{Context, Result};
use docx_rs::{
    AlignmentType, BorderType, BreakType, LineSpacing, Paragraph, Pic, Run, Table,
    TableAlignmentType, TableCell, TableCellBorder, TableCellBorderPosition, TableRow, VAlignType,
};
use std::io::Cursor;

use super::template::Template;
use crate::classify::{Role, TextGrid};
use crate::document::{CellParagraphs, ExtractedImage, FormattedRun, ParagraphContent, TableContent};

pub const NEUTRAL_COLOR: &str = "000000";

const TWIPS_PER_POINT: f32 = 20.0;
const EMU_PER_INCH: f32 = 914_400.0;

const HEADING_SIZE: f32 = 14.0;
const SUBHEADING_SIZE: f32 = 13.0;
const TABLE_TEXT_SIZE: f32 = 11.0;

const HEADING_SPACE_AFTER: f32 = 18.0;
const SUBHEADING_SPACE_AFTER: f32 = 14.0;
const BODY_SPACE_AFTER: f32 = 12.0;
const IMAGE_SPACE_AFTER: f32 = 12.0;
const TABLE_SPACER_AFTER: f32 = 6.0;
const CELL_PADDING: f32 = 3.0;

/// Border widths in eighths of a point
const INNER_BORDER: usize = 4;
const OUTER_BORDER: usize = 6;

/// Style attributes of one paragraph role
#[derive(Debug, Clone, Copy)]
pub struct RoleStyle {
    pub size: f32,
    pub force_bold: bool,
    pub alignment: AlignmentType,
    pub space_after: f32,
    pub keep_with_next: bool,
}

impl RoleStyle {
    pub fn for_role(role: Role, template: &Template) -> Self {
        match role {
            Role::Heading => RoleStyle {
                size: HEADING_SIZE,
                force_bold: true,
                alignment: template.heading_alignment.to_docx(),
                space_after: HEADING_SPACE_AFTER,
                keep_with_next: true,
            },
            Role::Subheading => RoleStyle {
                size: SUBHEADING_SIZE,
                force_bold: true,
                alignment: template.heading_alignment.to_docx(),
                space_after: SUBHEADING_SPACE_AFTER,
                keep_with_next: true,
            },
            Role::Body => RoleStyle {
                size: template.body_font_size,
                force_bold: false,
                alignment: AlignmentType::Left,
                space_after: BODY_SPACE_AFTER,
                keep_with_next: false,
            },
        }
    }
}

fn half_points(points: f32) -> usize {
    (points * 2.0).round() as usize
}

fn twips(points: f32) -> u32 {
    (points * TWIPS_PER_POINT).round() as u32
}

/// Add text to a run, turning `\t` and `\n` back into tabs and breaks
fn add_text_with_breaks(mut run: Run, text: &str) -> Run {
    for (line_index, line) in text.split('\n').enumerate() {
        if line_index > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        for (segment_index, segment) in line.split('\t').enumerate() {
            if segment_index > 0 {
                run = run.add_tab();
            }
            if !segment.is_empty() {
                run = run.add_text(segment);
            }
        }
    }
    run
}

/// Run in the neutral color with explicit size and emphasis
fn styled_run(source: &FormattedRun, size: f32, bold: bool, underline: bool) -> Run {
    let mut run = add_text_with_breaks(Run::new(), &source.text)
        .size(half_points(size))
        .color(NEUTRAL_COLOR);
    if bold {
        run = run.bold();
    }
    if source.formatting.italic {
        run = run.italic();
    }
    if underline {
        run = run.underline("single");
    }
    run
}

/// Rebuild a classified paragraph in the house style
pub fn styled_paragraph(role: Role, content: &ParagraphContent, template: &Template) -> Paragraph {
    let style = RoleStyle::for_role(role, template);

    let paragraph = content.runs.iter().fold(Paragraph::new(), |paragraph, run| {
        let bold = style.force_bold || run.formatting.bold;
        paragraph.add_run(styled_run(run, style.size, bold, false))
    });

    paragraph
        .align(style.alignment)
        .line_spacing(LineSpacing::new().after(twips(style.space_after)))
        .keep_next(style.keep_with_next)
        .widow_control(true)
}

/// Empty paragraph placed around tables
pub fn table_spacer() -> Paragraph {
    Paragraph::new()
        .line_spacing(LineSpacing::new().after(twips(TABLE_SPACER_AFTER)))
        .widow_control(true)
}

/// Rebuild a source table: same shape, neutral text, bold header row
pub fn styled_table(table: &TableContent, template: &Template) -> Table {
    build_table(&table.rows, template)
}

/// Table for a grid detected in plain text
pub fn grid_table(grid: &TextGrid, template: &Template) -> Table {
    let rows: Vec<Vec<CellParagraphs>> = grid
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|text| {
                    if text.is_empty() {
                        Vec::new()
                    } else {
                        vec![ParagraphContent::new(vec![FormattedRun::plain(text.clone())])]
                    }
                })
                .collect()
        })
        .collect();
    build_table(&rows, template)
}

fn build_table(rows: &[Vec<CellParagraphs>], template: &Template) -> Table {
    let row_count = rows.len();
    let column_count = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let empty_cell: CellParagraphs = Vec::new();

    let table_rows: Vec<TableRow> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let cells = (0..column_count)
                .map(|j| {
                    let paragraphs = row.get(j).unwrap_or(&empty_cell);
                    let edges = CellEdges {
                        top: i == 0,
                        bottom: i + 1 == row_count,
                        left: j == 0,
                        right: j + 1 == column_count,
                    };
                    styled_cell(paragraphs, i == 0, edges)
                })
                .collect();
            TableRow::new(cells)
        })
        .collect();

    let column_width = template.page.text_width_twips() as usize / column_count;
    Table::new(table_rows)
        .set_grid(vec![column_width; column_count])
        .align(TableAlignmentType::Center)
}

/// Which sides of a cell sit on the outside of the table
#[derive(Debug, Clone, Copy)]
struct CellEdges {
    top: bool,
    bottom: bool,
    left: bool,
    right: bool,
}

fn border(position: TableCellBorderPosition, outer: bool) -> TableCellBorder {
    TableCellBorder::new(position)
        .border_type(BorderType::Single)
        .size(if outer { OUTER_BORDER } else { INNER_BORDER })
        .color(NEUTRAL_COLOR)
}

fn styled_cell(paragraphs: &[ParagraphContent], header: bool, edges: CellEdges) -> TableCell {
    let mut cell = TableCell::new()
        .vertical_align(VAlignType::Center)
        .set_border(border(TableCellBorderPosition::Top, edges.top))
        .set_border(border(TableCellBorderPosition::Bottom, edges.bottom))
        .set_border(border(TableCellBorderPosition::Left, edges.left))
        .set_border(border(TableCellBorderPosition::Right, edges.right));

    let cell_paragraph = || {
        Paragraph::new()
            .align(AlignmentType::Center)
            .line_spacing(
                LineSpacing::new()
                    .before(twips(CELL_PADDING))
                    .after(twips(CELL_PADDING)),
            )
            .widow_control(true)
    };

    if paragraphs.is_empty() {
        // Word needs at least one paragraph in every cell
        return cell.add_paragraph(cell_paragraph());
    }

    for content in paragraphs {
        let paragraph = content.runs.iter().fold(cell_paragraph(), |paragraph, run| {
            let bold = header || run.formatting.bold;
            paragraph.add_run(styled_run(run, TABLE_TEXT_SIZE, bold, run.formatting.underline))
        });
        cell = cell.add_paragraph(paragraph);
    }

    cell
}

/// Display size in EMU: always `width_inches` wide, height keeping the aspect ratio
pub fn image_display_size(width_px: u32, height_px: u32, width_inches: f32) -> (u32, u32) {
    let width = width_inches * EMU_PER_INCH;
    if width_px == 0 {
        return (width.round() as u32, 0);
    }
    let height = width * (height_px as f32 / width_px as f32);
    (width.round() as u32, height.round() as u32)
}

/// Centered image block; fails when the image cannot be decoded
pub fn image_paragraph(image: &ExtractedImage, template: &Template) -> Result<Paragraph> {
    let decoded = image::load_from_memory(&image.data)
        .with_context(|| format!("Cannot decode image {} ({:?})", image.name, image.format))?;
    let (width_px, height_px) = (decoded.width(), decoded.height());

    // Everything is embedded as PNG so the writer never has to guess the codec
    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .with_context(|| format!("Cannot re-encode image {}", image.name))?;

    let (width_emu, height_emu) =
        image_display_size(width_px, height_px, template.max_image_width_inches());
    let pic = Pic::new_with_dimensions(png, width_px, height_px).size(width_emu, height_emu);

    Ok(Paragraph::new()
        .add_run(Run::new().add_image(pic))
        .align(AlignmentType::Center)
        .line_spacing(LineSpacing::new().after(twips(IMAGE_SPACE_AFTER)))
        .widow_control(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::template::HeadingAlignment;

    #[test]
    fn role_styles_follow_the_house_table() {
        let template = Template::default();

        let heading = RoleStyle::for_role(Role::Heading, &template);
        assert_eq!(half_points(heading.size), 28);
        assert!(heading.force_bold && heading.keep_with_next);
        assert_eq!(twips(heading.space_after), 360);

        let sub = RoleStyle::for_role(Role::Subheading, &template);
        assert_eq!(half_points(sub.size), 26);
        assert_eq!(twips(sub.space_after), 280);

        let body = RoleStyle::for_role(Role::Body, &template);
        assert_eq!(half_points(body.size), 25);
        assert!(!body.force_bold && !body.keep_with_next);
        assert!(matches!(body.alignment, AlignmentType::Left));
    }

    #[test]
    fn centered_variant_moves_headings_only() {
        let template = Template {
            heading_alignment: HeadingAlignment::Center,
            ..Template::default()
        };
        assert!(matches!(
            RoleStyle::for_role(Role::Heading, &template).alignment,
            AlignmentType::Center
        ));
        assert!(matches!(
            RoleStyle::for_role(Role::Body, &template).alignment,
            AlignmentType::Left
        ));
    }

    #[test]
    fn wide_images_scale_to_the_default_width() {
        // 1200px at 96dpi is 12.5in
        let (w, h) = image_display_size(1200, 600, 6.0);
        assert_eq!(w, 5_486_400);
        assert_eq!(h, 2_743_200);
    }

    #[test]
    fn small_images_are_shown_at_the_default_width() {
        // 96x48px would be 1in wide at its natural size
        let (w, h) = image_display_size(96, 48, 6.0);
        assert_eq!(w, 5_486_400);
        assert_eq!(h, 2_743_200);
    }

    #[test]
    fn narrow_text_column_caps_the_width() {
        let (w, h) = image_display_size(300, 300, 4.5);
        assert_eq!(w, 4_114_800);
        assert_eq!(h, 4_114_800);
    }

    #[test]
    fn undecodable_image_is_an_error() {
        let image = ExtractedImage {
            name: "chart.emf".into(),
            data: vec![1, 2, 3, 4],
            format: crate::document::ImageFormat::Emf,
            anchor: None,
        };
        assert!(image_paragraph(&image, &Template::default()).is_err());
    }
}
