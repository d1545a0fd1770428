//! Per-file reconstruction pipeline
//!
//! One input file in, one `processed_<stem>.docx` out, plus the source
//! images saved next to it. Every failure comes back as an `Err` so the job
//! loop can record it against the file and move on.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::document::{ExtractedImage, SourceDocument, SourceKind, extract};
use crate::reconstruct::{ReconstructionSummary, Template, reconstruct};

/// Directory under a job's output root that holds extracted images
pub const IMAGES_DIR: &str = "images";
const OUTPUT_PREFIX: &str = "processed_";

/// Converts a PDF into an equivalent .docx package
///
/// No converter ships with this crate; embedders plug one in through
/// [`crate::jobs::JobManager::with_pdf_normalizer`].
pub trait PdfNormalizer: Send + Sync {
    fn to_docx(&self, pdf: &[u8]) -> Result<Vec<u8>>;
}

/// What a successful file run produced
#[derive(Debug, Clone, Serialize)]
pub struct FileOutput {
    /// File name of the reconstructed document inside the output directory
    pub output_name: String,
    pub output_path: PathBuf,
    pub images_saved: usize,
    pub summary: ReconstructionSummary,
}

/// Output file name for an input, whatever its extension
pub fn output_name(input_name: &str) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(input_name);
    format!("{OUTPUT_PREFIX}{stem}.docx")
}

fn validate_input(input: &Path) -> Result<SourceKind> {
    if !input.exists() {
        bail!("File not found");
    }
    let metadata = fs::metadata(input)?;
    if !metadata.is_file() {
        bail!("Not a regular file");
    }
    if metadata.len() == 0 {
        bail!("File is empty");
    }
    SourceKind::from_path(input).context("Unsupported file type")
}

/// Run extraction, classification and reconstruction for one file
pub fn reconstruct_file(
    input: &Path,
    template: &Template,
    output_dir: &Path,
    normalizer: Option<&dyn PdfNormalizer>,
) -> Result<FileOutput> {
    let kind = validate_input(input)?;
    let input_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .context("File name is not valid UTF-8")?
        .to_string();

    let bytes = fs::read(input).with_context(|| format!("Failed to read {input_name}"))?;
    let docx_bytes = match kind {
        SourceKind::Docx => bytes,
        SourceKind::Pdf => {
            let Some(normalizer) = normalizer else {
                bail!("PDF normalization is not available");
            };
            debug!(file = %input_name, "Normalizing PDF");
            normalizer
                .to_docx(&bytes)
                .context("PDF normalization failed")?
        }
    };

    let source = SourceDocument::from_bytes(input_name.as_str(), &docx_bytes)?;
    let stem = Path::new(&input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let images_saved = save_images(source.images(), &output_dir.join(IMAGES_DIR).join(stem))?;

    let elements = extract(&source);
    let reconstruction = reconstruct(&elements, template, source.images());
    let summary = reconstruction.summary.clone();

    let output_name = output_name(&input_name);
    let output_path = output_dir.join(&output_name);
    let bytes = reconstruction.to_bytes()?;
    fs::write(&output_path, bytes)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    info!(
        file = %input_name,
        output = %output_name,
        elements = elements.len(),
        paragraphs = summary.paragraphs(),
        tables = summary.tables + summary.text_tables,
        images = summary.images_placed + summary.images_appended,
        "Reconstructed document"
    );

    Ok(FileOutput {
        output_name,
        output_path,
        images_saved,
        summary,
    })
}

/// Write the source images under `dir`; a failed write only costs that image
fn save_images(images: &[ExtractedImage], dir: &Path) -> Result<usize> {
    if images.is_empty() {
        return Ok(0);
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create image directory {}", dir.display()))?;

    let mut saved = 0;
    for (index, image) in images.iter().enumerate() {
        // Names are unique within a package, but a name may be referenced twice
        let path = dir.join(&image.name);
        if path.exists() {
            continue;
        }
        match fs::write(&path, &image.data) {
            Ok(()) => saved += 1,
            Err(e) => warn!(index, image = %image.name, "Failed to save image: {e}"),
        }
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_drop_the_extension() {
        assert_eq!(output_name("report.docx"), "processed_report.docx");
        assert_eq!(output_name("scan.pdf"), "processed_scan.docx");
        assert_eq!(output_name("q3.final.DOCX"), "processed_q3.final.docx");
    }

    #[test]
    fn validation_rejects_missing_empty_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.docx");
        assert!(validate_input(&missing).unwrap_err().to_string().contains("not found"));

        let empty = dir.path().join("empty.docx");
        fs::write(&empty, b"").unwrap();
        assert!(validate_input(&empty).unwrap_err().to_string().contains("empty"));

        let text = dir.path().join("notes.txt");
        fs::write(&text, b"hello").unwrap();
        assert!(validate_input(&text).is_err());

        assert!(validate_input(dir.path()).is_err());
    }

    #[test]
    fn pdf_without_normalizer_fails_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("scan.pdf");
        fs::write(&pdf, b"%PDF-1.7").unwrap();

        let err = reconstruct_file(&pdf, &Template::default(), dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("PDF normalization is not available"));
    }
}
