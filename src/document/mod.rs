//! Document reading and element extraction
//!
//! This module parses Microsoft Word (.docx) packages and turns their body
//! into an ordered sequence of typed content elements, with the package
//! images carried alongside.

pub mod extract;
pub(crate) mod images;
pub mod io;
pub mod models;
pub(crate) mod parsing;
pub mod reader;

pub use extract::{content_count, extract};
pub use io::SourceKind;
pub use models::*;
pub use reader::SourceDocument;
