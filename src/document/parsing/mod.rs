//! Document parsing utilities
//!
//! This module contains specialized parsing functions for the docx-rs
//! structures the extractor walks over.

pub(crate) mod formatting;
pub(crate) mod table;
