//! Core data structures for extracted document content
//!
//! This module defines the typed content elements produced by the extractor,
//! the run-level formatting they carry, and the images pulled out of the
//! source package.

use serde::{Deserialize, Serialize};

// Type aliases for convenience
pub type CellParagraphs = Vec<ParagraphContent>;
pub type TableRows = Vec<Vec<CellParagraphs>>;

/// One piece of source content, in source document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContentElement {
    Paragraph(ParagraphContent),
    Table(TableContent),
    Image(ImageElement),
}

impl ContentElement {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentElement::Paragraph(_) => "paragraph",
            ContentElement::Table(_) => "table",
            ContentElement::Image(_) => "image",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextFormatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Point size, when the run declares one
    pub font_size: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormattedRun {
    pub text: String,
    pub formatting: TextFormatting,
}

impl FormattedRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            formatting: TextFormatting::default(),
        }
    }

    /// Consolidate adjacent runs with identical formatting into single runs
    pub fn consolidate_runs(runs: Vec<FormattedRun>) -> Vec<FormattedRun> {
        let mut consolidated: Vec<FormattedRun> = Vec::with_capacity(runs.len());

        for run in runs {
            match consolidated.last_mut() {
                Some(current) if current.formatting == run.formatting => {
                    current.text.push_str(&run.text);
                }
                _ => consolidated.push(run),
            }
        }

        consolidated
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParagraphContent {
    pub runs: Vec<FormattedRun>,
}

impl ParagraphContent {
    pub fn new(runs: Vec<FormattedRun>) -> Self {
        Self { runs }
    }

    /// Concatenated run text, including tab and line-break characters
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|run| run.text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableContent {
    pub rows: TableRows,
}

impl TableContent {
    pub fn new(rows: TableRows) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row wins; ragged rows are padded when the table is rebuilt
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell_text(&self, row: usize, column: usize) -> Option<String> {
        let cell = self.rows.get(row)?.get(column)?;
        Some(
            cell.iter()
                .map(ParagraphContent::text)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

/// Where an image sat in the source body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageAnchor {
    /// Ordinal of the body-level paragraph that carried the drawing
    pub paragraph: usize,
    /// Position of the image in the extracted image list
    pub sequence: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageElement {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub anchor: ImageAnchor,
}

/// An image pulled from the source package, in extraction order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// Media file name inside the package, e.g. `image1.png`
    pub name: String,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub anchor: Option<ImageAnchor>,
}

impl ExtractedImage {
    pub fn to_element(&self) -> Option<ImageElement> {
        Some(ImageElement {
            data: self.data.clone(),
            format: self.format,
            anchor: self.anchor?,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Webp,
    Emf,
    Wmf,
    #[default]
    Unknown,
}

impl ImageFormat {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "png" => ImageFormat::Png,
            "jpg" | "jpeg" | "jpe" => ImageFormat::Jpeg,
            "gif" => ImageFormat::Gif,
            "bmp" | "dib" => ImageFormat::Bmp,
            "tif" | "tiff" => ImageFormat::Tiff,
            "webp" => ImageFormat::Webp,
            "emf" => ImageFormat::Emf,
            "wmf" => ImageFormat::Wmf,
            _ => ImageFormat::Unknown,
        }
    }

    /// Sniff the format from the payload when the package name is unhelpful
    pub fn sniff(data: &[u8]) -> Self {
        match image::guess_format(data) {
            Ok(image::ImageFormat::Png) => ImageFormat::Png,
            Ok(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
            Ok(image::ImageFormat::Gif) => ImageFormat::Gif,
            Ok(image::ImageFormat::Bmp) => ImageFormat::Bmp,
            Ok(image::ImageFormat::Tiff) => ImageFormat::Tiff,
            Ok(image::ImageFormat::WebP) => ImageFormat::Webp,
            _ => ImageFormat::Unknown,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Webp => "webp",
            ImageFormat::Emf => "emf",
            ImageFormat::Wmf => "wmf",
            ImageFormat::Unknown => "bin",
        }
    }

    /// Whether the raster codec can decode this format for re-embedding
    pub fn is_raster(self) -> bool {
        !matches!(
            self,
            ImageFormat::Emf | ImageFormat::Wmf | ImageFormat::Unknown
        )
    }
}
