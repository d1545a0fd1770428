//! File I/O operations and validation
//!
//! This module handles input type detection, .docx package validation and
//! raw access to package parts.

use anyhow::{Result, bail};
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

/// Kind of input the pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Docx,
    Pdf,
}

impl SourceKind {
    /// Detect the input kind from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "docx" => Some(SourceKind::Docx),
            "pdf" => Some(SourceKind::Pdf),
            _ => None,
        }
    }
}

pub(crate) type Package<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Validates that the bytes form a legitimate .docx package
pub(crate) fn open_docx_package(bytes: &[u8]) -> Result<Package<'_>> {
    if bytes.is_empty() {
        bail!("File is empty");
    }

    let mut archive = match ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(err) => bail!("Invalid .docx file: not a ZIP package ({err})"),
    };

    if archive.by_name("word/document.xml").is_err() {
        // Check if it might be an Excel file
        if archive.by_name("xl/workbook.xml").is_ok() {
            bail!("This appears to be an Excel file (.xlsx), not a Word document");
        }

        bail!(
            "Invalid .docx file: missing word/document.xml\n\
            This file may be corrupted or is not a valid Word document."
        );
    }

    Ok(archive)
}

/// Read a package part; `Ok(None)` when the part does not exist
pub(crate) fn read_part(archive: &mut Package<'_>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let mut data = Vec::with_capacity(part.size() as usize);
    part.read_to_end(&mut data)?;
    Ok(Some(data))
}

/// Resolve a relationship target against the part directory that owns it
///
/// `("word", "media/image1.png")` becomes `word/media/image1.png`, `..`
/// segments climb out of the base, and absolute targets ignore the base.
pub(crate) fn resolve_part_target(base_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_is_case_insensitive() {
        assert_eq!(
            SourceKind::from_path(Path::new("Report.DOCX")),
            Some(SourceKind::Docx)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("scan.pdf")),
            Some(SourceKind::Pdf)
        );
        assert_eq!(SourceKind::from_path(Path::new("notes.doc")), None);
        assert_eq!(SourceKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn rejects_empty_and_non_zip_bytes() {
        assert!(open_docx_package(&[]).is_err());
        let err = open_docx_package(b"definitely not a zip").unwrap_err();
        assert!(err.to_string().contains("not a ZIP package"));
    }

    #[test]
    fn resolves_relationship_targets() {
        assert_eq!(
            resolve_part_target("word", "media/image1.png"),
            "word/media/image1.png"
        );
        assert_eq!(
            resolve_part_target("word", "../media/image1.png"),
            "media/image1.png"
        );
        assert_eq!(
            resolve_part_target("word", "/word/media/a.jpeg"),
            "word/media/a.jpeg"
        );
    }
}
