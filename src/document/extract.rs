//! Element extraction
//!
//! Walks the body of a source document once, in document order, and builds
//! typed content elements directly from each node.

use tracing::debug;

use super::models::*;
use super::parsing::formatting::extract_paragraph_runs;
use super::parsing::table::extract_table_content;
use super::reader::SourceDocument;

/// Extract the ordered element sequence of a source document
///
/// - Whitespace-only paragraphs are dropped.
/// - A paragraph with text and images yields the paragraph first, then its images.
/// - A paragraph with images and no text yields only its images.
pub fn extract(source: &SourceDocument) -> Vec<ContentElement> {
    let mut elements = Vec::new();
    let mut paragraph_ordinal = 0;
    let mut dropped = 0;

    for child in source.body() {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                let image_indices = source.paragraph_images(paragraph_ordinal);
                paragraph_ordinal += 1;

                let paragraph =
                    ParagraphContent::new(FormattedRun::consolidate_runs(extract_paragraph_runs(para)));

                if paragraph.is_blank() {
                    if image_indices.is_empty() {
                        dropped += 1;
                    }
                } else {
                    elements.push(ContentElement::Paragraph(paragraph));
                }

                elements.extend(
                    image_indices
                        .iter()
                        .filter_map(|&index| source.images().get(index))
                        .filter_map(ExtractedImage::to_element)
                        .map(ContentElement::Image),
                );
            }
            docx_rs::DocumentChild::Table(table) => {
                if let Some(content) = extract_table_content(table) {
                    elements.push(ContentElement::Table(content));
                }
            }
            _ => {
                // Section markers, bookmarks, structured tags: nothing to carry over
            }
        }
    }

    debug!(
        document = source.name(),
        elements = elements.len(),
        dropped_blank = dropped,
        "Extracted content elements"
    );

    elements
}

/// Count of elements that carry content, used to compare two extractions
pub fn content_count(elements: &[ContentElement]) -> usize {
    elements
        .iter()
        .filter(|element| match element {
            ContentElement::Paragraph(paragraph) => !paragraph.is_blank(),
            ContentElement::Table(_) | ContentElement::Image(_) => true,
        })
        .count()
}
