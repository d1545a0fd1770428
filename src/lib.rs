//! docreflow: rebuild office documents into a fixed house template
//!
//! Uploaded .docx files (and PDFs, given a normalizer) are walked in document
//! order, their paragraphs reclassified as heading, subheading or body, and
//! everything is replayed into a new document with one consistent style.
//! The job layer runs that pipeline in the background, one task per job,
//! and tolerates failures of individual files.

pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod reconstruct;

// Re-export commonly used types
pub use classify::{ClassificationState, Role, TextGrid, classify_heading, classify_subheading, detect_table_from_text};
pub use config::Config;
pub use document::{ContentElement, SourceDocument, extract};
pub use error::{ErrorKind, ReflowError};
pub use jobs::{Job, JobManager, JobStatus, Upload};
pub use pipeline::{PdfNormalizer, reconstruct_file};
pub use reconstruct::{Template, TemplateSource, reconstruct};
