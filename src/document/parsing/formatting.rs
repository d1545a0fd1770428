//! Text extraction and formatting utilities
//!
//! This module handles extraction of text and run formatting from docx-rs
//! paragraph and run elements.

use std::fmt::Debug;

use super::super::models::*;

/// Extract formatted runs from a paragraph, in order
///
/// Tabs and line breaks are kept as `\t` and `\n` so later stages can spot
/// tabular text. Deleted (tracked) text is skipped.
pub(crate) fn extract_paragraph_runs(para: &docx_rs::Paragraph) -> Vec<FormattedRun> {
    let mut runs = Vec::new();
    collect_runs(&para.children, &mut runs);
    runs
}

/// Hyperlink children are paragraph children themselves, so this recurses
fn collect_runs(children: &[docx_rs::ParagraphChild], runs: &mut Vec<FormattedRun>) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run(runs, run),
            docx_rs::ParagraphChild::Insert(insert) => {
                for child in &insert.children {
                    if let docx_rs::InsertChild::Run(run) = child {
                        push_run(runs, run);
                    }
                }
            }
            docx_rs::ParagraphChild::Hyperlink(link) => collect_runs(&link.children, runs),
            docx_rs::ParagraphChild::Delete(_) => {}
            _ => {}
        }
    }
}

fn push_run(runs: &mut Vec<FormattedRun>, run: &docx_rs::Run) {
    let text = extract_run_text(run);
    if !text.is_empty() {
        runs.push(FormattedRun {
            text,
            formatting: extract_run_formatting(run),
        });
    }
}

/// Extract text from a run; drawings contribute no text
pub(crate) fn extract_run_text(run: &docx_rs::Run) -> String {
    let mut text = String::new();

    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(text_elem) => text.push_str(&text_elem.text),
            docx_rs::RunChild::Tab(_) => text.push('\t'),
            // Break types are private, every break becomes a newline
            docx_rs::RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }

    text
}

/// Extract formatting information from a run
pub(crate) fn extract_run_formatting(run: &docx_rs::Run) -> TextFormatting {
    let props = &run.run_property;

    TextFormatting {
        bold: toggle_enabled(&props.bold),
        italic: toggle_enabled(&props.italic),
        underline: props
            .underline
            .as_ref()
            .and_then(debug_val)
            .is_some_and(|val| val != "none"),
        // w:sz is stored in half-points
        font_size: props
            .sz
            .as_ref()
            .and_then(debug_val)
            .and_then(|val| val.parse::<f32>().ok())
            .map(|half_points| half_points / 2.0),
    }
}

/// A toggle property (`<w:b/>`, `<w:i/>`) is on unless it says `val="false"`
fn toggle_enabled<T: Debug>(prop: &Option<T>) -> bool {
    match prop {
        Some(value) => debug_val(value).is_none_or(|val| val != "false"),
        None => false,
    }
}

/// Read the `val` field of a docx-rs property through its Debug output
///
/// The property structs keep their fields private, so this is the only
/// stable way to get at the raw attribute value.
pub(crate) fn debug_val<T: Debug>(value: &T) -> Option<String> {
    let debug = format!("{value:?}");
    let start = debug.find("val: ")? + "val: ".len();
    let rest = &debug[start..];
    let raw = rest
        .split([',', '}', ')'])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    Some(raw.trim_matches('"').to_string())
}
