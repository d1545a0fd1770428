//! Error types for the job-facing API
//!
//! Pipeline internals work with `anyhow` and are flattened to a reason string
//! per file. Everything a caller of [`crate::jobs::JobManager`] can see comes
//! back as a [`ReflowError`], which [`ReflowError::kind`] sorts into the four
//! buckets a transport layer needs.

use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, ReflowError>;

#[derive(Debug, Error)]
pub enum ReflowError {
    // Input errors, raised before a job exists
    #[error("Unsupported file type: '{filename}' (expected .docx or .pdf)")]
    UnsupportedFileType { filename: String },

    #[error("File '{filename}' is empty")]
    EmptyFile { filename: String },

    #[error("File '{filename}' is {size} bytes, above the {limit} byte limit")]
    FileTooLarge {
        filename: String,
        size: u64,
        limit: u64,
    },

    #[error("Invalid file name: '{filename}'")]
    InvalidFileName { filename: String },

    #[error("File '{filename}' was uploaded more than once")]
    DuplicateFileName { filename: String },

    #[error("No files were uploaded")]
    NoFiles,

    // Retrieval errors
    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Job {job_id} is still {status}")]
    JobNotCompleted { job_id: Uuid, status: String },

    #[error("Output '{filename}' not found for job {job_id}")]
    OutputNotFound { job_id: Uuid, filename: String },

    // Job-fatal
    #[error("Template error: {0}")]
    Template(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification for mapping errors onto responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is wrong (400)
    Input,
    /// Unknown job or artifact (404)
    NotFound,
    /// The job exists but is not in a state that allows the request (409)
    Conflict,
    /// Anything on our side (500)
    Internal,
}

impl ReflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReflowError::UnsupportedFileType { .. }
            | ReflowError::EmptyFile { .. }
            | ReflowError::FileTooLarge { .. }
            | ReflowError::InvalidFileName { .. }
            | ReflowError::DuplicateFileName { .. }
            | ReflowError::NoFiles => ErrorKind::Input,
            ReflowError::JobNotFound(_) | ReflowError::OutputNotFound { .. } => ErrorKind::NotFound,
            ReflowError::JobNotCompleted { .. } => ErrorKind::Conflict,
            ReflowError::Template(_)
            | ReflowError::Io(_)
            | ReflowError::Archive(_)
            | ReflowError::Serialization(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(
            ReflowError::EmptyFile {
                filename: "a.docx".into()
            }
            .kind(),
            ErrorKind::Input
        );
        assert_eq!(ReflowError::NoFiles.kind(), ErrorKind::Input);
        assert_eq!(ReflowError::JobNotFound(Uuid::nil()).kind(), ErrorKind::NotFound);
        assert_eq!(
            ReflowError::JobNotCompleted {
                job_id: Uuid::nil(),
                status: "processing".into()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ReflowError::Io(std::io::Error::other("disk")).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn messages_name_the_file() {
        let err = ReflowError::FileTooLarge {
            filename: "big.docx".into(),
            size: 30,
            limit: 10,
        };
        assert!(err.to_string().contains("big.docx"));
    }
}
