//! On-disk layout of job storage
//!
//! ```text
//! <root>/uploads/<job-id>/<input files>
//! <root>/outputs/<job-id>/processed_*.docx
//! <root>/outputs/<job-id>/images/<input-stem>/<media>
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use uuid::Uuid;

const UPLOADS_DIR: &str = "uploads";
const OUTPUTS_DIR: &str = "outputs";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct JobStorage {
    root: PathBuf,
}

impl JobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn upload_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join(UPLOADS_DIR).join(job_id.to_string())
    }

    pub fn output_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join(OUTPUTS_DIR).join(job_id.to_string())
    }

    /// Create the job's upload and output directories
    pub fn provision(&self, job_id: Uuid) -> io::Result<()> {
        fs::create_dir_all(self.upload_dir(job_id))?;
        fs::create_dir_all(self.output_dir(job_id))?;
        Ok(())
    }

    /// Remove everything the job owns; missing directories are fine
    pub fn remove(&self, job_id: Uuid) -> io::Result<()> {
        for dir in [self.upload_dir(job_id), self.output_dir(job_id)] {
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Remove job storage last modified more than `max_age` ago
    ///
    /// Works from the directory tree alone, so directories left behind by a
    /// crashed process are reclaimed too.
    pub fn sweep_expired(&self, max_age: Duration) -> SweepReport {
        let mut report = SweepReport::default();
        let now = SystemTime::now();

        for area in [UPLOADS_DIR, OUTPUTS_DIR] {
            let dir = self.root.join(area);
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(dir = %dir.display(), "Cannot scan storage: {e}");
                    report.failed += 1;
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                let Ok(metadata) = entry.metadata() else {
                    continue;
                };
                let expired = metadata
                    .modified()
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .is_some_and(|age| age > max_age);
                if !expired {
                    continue;
                }

                let result = if metadata.is_dir() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                };
                match result {
                    Ok(()) => {
                        debug!(path = %path.display(), "Swept expired job storage");
                        report.removed += 1;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), "Failed to sweep: {e}");
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }
}
