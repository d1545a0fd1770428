//! Source document loading
//!
//! A `SourceDocument` is the parsed docx-rs tree of one input together with
//! the images pulled from its package. It is the only thing the extractor
//! reads from.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use super::images::{ImageScan, scan_package_images};
use super::io::open_docx_package;
use super::models::ExtractedImage;

pub struct SourceDocument {
    name: String,
    docx: docx_rs::Docx,
    images: ImageScan,
}

impl SourceDocument {
    /// Parse a .docx package held in memory
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        let mut package = open_docx_package(bytes)?;
        let images = scan_package_images(&mut package)
            .with_context(|| format!("Failed to scan images in {name}"))?;
        let docx = docx_rs::read_docx(bytes)
            .with_context(|| format!("Failed to parse {name} as a Word document"))?;

        debug!(
            document = %name,
            body_children = docx.document.children.len(),
            images = images.images.len(),
            "Loaded source document"
        );

        Ok(Self { name, docx, images })
    }

    /// Read and parse a .docx file from disk
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.docx")
            .to_string();
        Self::from_bytes(name, &bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Body nodes in document order
    pub(crate) fn body(&self) -> &[docx_rs::DocumentChild] {
        &self.docx.document.children
    }

    /// Every image in the package, in extraction order
    pub fn images(&self) -> &[ExtractedImage] {
        &self.images.images
    }

    /// Image indices anchored at the n-th paragraph of the body
    pub(crate) fn paragraph_images(&self, paragraph: usize) -> &[usize] {
        self.images
            .paragraph_images
            .get(&paragraph)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("body_children", &self.docx.document.children.len())
            .field("images", &self.images.images.len())
            .finish()
    }
}
