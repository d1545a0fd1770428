//! Document reconstruction
//!
//! Replays extracted elements into a fresh document built from a template.
//! The walk happens in two steps: [`plan`] decides what each element becomes
//! (classified paragraph, rebuilt table, text table, image) and [`reconstruct`]
//! renders that plan with the house style.

pub mod style;
pub mod template;

use anyhow::{Result, anyhow};
use serde::Serialize;
use std::io::Cursor;
use tracing::{debug, warn};

use crate::classify::{ClassificationState, Role, TextGrid, detect_table_from_text, is_multiline};
use crate::document::{ContentElement, ExtractedImage, ParagraphContent, TableContent};

pub use template::{HeadingAlignment, PageGeometry, Template, TemplateSource};

/// What one slot of the output document becomes
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph { role: Role, content: ParagraphContent },
    Table(TableContent),
    TextTable(TextGrid),
    Image {
        /// Index into the extracted image list
        index: usize,
        /// Appended after the walk because no anchor claimed it
        trailing: bool,
    },
}

/// Decide the output block for every element, in source order
///
/// Each image is placed at most once. Images no anchor claimed are appended
/// at the end in extraction order.
pub fn plan(elements: &[ContentElement], images: &[ExtractedImage]) -> Vec<Block> {
    let mut state = ClassificationState::new();
    let mut placed = vec![false; images.len()];
    let mut blocks = Vec::with_capacity(elements.len());

    for element in elements {
        match element {
            ContentElement::Image(image) => {
                let index = image.anchor.sequence;
                match placed.get_mut(index) {
                    Some(seen) if !*seen => {
                        *seen = true;
                        blocks.push(Block::Image {
                            index,
                            trailing: false,
                        });
                    }
                    _ => debug!(index, "Image anchor already used or out of range"),
                }
            }
            ContentElement::Paragraph(paragraph) => {
                let text = paragraph.text();
                if is_multiline(&text) {
                    if let Some(grid) = detect_table_from_text(&text) {
                        blocks.push(Block::TextTable(grid));
                        continue;
                    }
                }
                let role = state.advance(&text);
                blocks.push(Block::Paragraph {
                    role,
                    content: paragraph.clone(),
                });
            }
            ContentElement::Table(table) => blocks.push(Block::Table(table.clone())),
        }
    }

    blocks.extend(
        placed
            .iter()
            .enumerate()
            .filter(|&(_, &seen)| !seen)
            .map(|(index, _)| Block::Image {
                index,
                trailing: true,
            }),
    );

    blocks
}

/// Counts of what went into a reconstructed document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconstructionSummary {
    pub headings: usize,
    pub subheadings: usize,
    pub body: usize,
    pub tables: usize,
    pub text_tables: usize,
    pub images_placed: usize,
    pub images_appended: usize,
    /// Images that could not be decoded and were left out
    pub images_skipped: usize,
}

impl ReconstructionSummary {
    pub fn paragraphs(&self) -> usize {
        self.headings + self.subheadings + self.body
    }
}

pub struct Reconstruction {
    docx: docx_rs::Docx,
    pub summary: ReconstructionSummary,
}

impl std::fmt::Debug for Reconstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconstruction")
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl Reconstruction {
    /// Serialize the document to .docx bytes
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.docx
            .build()
            .pack(&mut buffer)
            .map_err(|e| anyhow!("Failed to write document: {e}"))?;
        Ok(buffer.into_inner())
    }
}

/// Build a new document from `elements` inside `template`
pub fn reconstruct(
    elements: &[ContentElement],
    template: &Template,
    images: &[ExtractedImage],
) -> Reconstruction {
    let mut docx = template.new_document();
    let mut summary = ReconstructionSummary::default();

    for block in plan(elements, images) {
        match block {
            Block::Paragraph { role, content } => {
                match role {
                    Role::Heading => summary.headings += 1,
                    Role::Subheading => summary.subheadings += 1,
                    Role::Body => summary.body += 1,
                }
                docx = docx.add_paragraph(style::styled_paragraph(role, &content, template));
            }
            Block::Table(table) => {
                summary.tables += 1;
                docx = docx
                    .add_paragraph(style::table_spacer())
                    .add_table(style::styled_table(&table, template))
                    .add_paragraph(style::table_spacer());
            }
            Block::TextTable(grid) => {
                summary.text_tables += 1;
                docx = docx
                    .add_paragraph(style::table_spacer())
                    .add_table(style::grid_table(&grid, template))
                    .add_paragraph(style::table_spacer());
            }
            Block::Image { index, trailing } => {
                let Some(image) = images.get(index) else {
                    continue;
                };
                match style::image_paragraph(image, template) {
                    Ok(paragraph) => {
                        if trailing {
                            summary.images_appended += 1;
                        } else {
                            summary.images_placed += 1;
                        }
                        docx = docx.add_paragraph(paragraph);
                    }
                    Err(e) => {
                        warn!(image = %image.name, "Skipping image: {e:#}");
                        summary.images_skipped += 1;
                    }
                }
            }
        }
    }

    debug!(?summary, "Reconstructed document");
    Reconstruction { docx, summary }
}
