//! Zip bundle of a finished job
//!
//! Layout: every output document at the top level, the `images/` subtree of
//! the job's output directory, and `Error Report.txt` when any file failed.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::model::Job;
use crate::error::{ReflowError, Result};
use crate::pipeline::IMAGES_DIR;

pub const ERROR_REPORT_NAME: &str = "Error Report.txt";

/// Plain-text list of failed files and why they failed
pub fn error_report(job: &Job) -> String {
    let mut report = format!(
        "Job {}\n{} of {} file(s) failed to process.\n\n",
        job.id,
        job.errors.len(),
        job.inputs.len()
    );
    for error in &job.errors {
        report.push_str(&format!("{}: {}\n", error.filename, error.error));
    }
    report
}

/// Build the bundle archive in memory
pub fn build_bundle(job: &Job, output_dir: &Path) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for output in &job.outputs {
        let bytes = fs::read(output_dir.join(output)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReflowError::OutputNotFound {
                job_id: job.id,
                filename: output.clone(),
            },
            _ => ReflowError::Io(e),
        })?;
        zip.start_file(output.as_str(), options)?;
        zip.write_all(&bytes)?;
    }

    zip.add_directory(format!("{IMAGES_DIR}/"), options)?;
    add_tree(&mut zip, &output_dir.join(IMAGES_DIR), IMAGES_DIR, options)?;

    if !job.errors.is_empty() {
        zip.start_file(ERROR_REPORT_NAME, options)?;
        zip.write_all(error_report(job).as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Add a directory tree under `prefix`, in sorted order
fn add_tree(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    dir: &Path,
    prefix: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut entries = match fs::read_dir(dir) {
        Ok(entries) => entries.collect::<std::io::Result<Vec<_>>>()?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let entry_name = format!("{prefix}/{name}");
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            zip.add_directory(format!("{entry_name}/"), options)?;
            add_tree(zip, &path, &entry_name, options)?;
        } else {
            zip.start_file(entry_name, options)?;
            zip.write_all(&fs::read(&path)?)?;
        }
    }
    Ok(())
}
