use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, background task not started yet
    Pending,
    Processing,
    /// At least one file produced an output
    Completed,
    /// No file produced an output, or the job hit a fatal error
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One input that could not be reconstructed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileError {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub errors: Vec<FileError>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Reason the job as a whole failed
    pub error: Option<String>,
}

impl Job {
    pub fn new(inputs: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            inputs,
            outputs: Vec::new(),
            errors: Vec::new(),
            finished_at: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn start(&mut self) {
        self.status = JobStatus::Processing;
    }

    pub(crate) fn record_output(&mut self, output: String) {
        self.outputs.push(output);
    }

    pub(crate) fn record_error(&mut self, filename: String, error: String) {
        self.errors.push(FileError { filename, error });
    }

    /// Settle the job from what the file loop recorded
    pub(crate) fn finish(&mut self) {
        if self.outputs.is_empty() {
            self.status = JobStatus::Failed;
            self.error = Some(format!(
                "None of the {} uploaded file(s) could be processed",
                self.inputs.len()
            ));
        } else {
            self.status = JobStatus::Completed;
        }
        self.finished_at = Some(Utc::now());
    }

    /// Abort the whole job
    pub(crate) fn fail(&mut self, reason: String) {
        self.status = JobStatus::Failed;
        self.error = Some(reason);
        self.finished_at = Some(Utc::now());
    }
}
