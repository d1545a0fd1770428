//! Job lifecycle
//!
//! A job moves `pending -> processing -> completed | failed` and is only ever
//! mutated by its own background task. Everyone else reads snapshots taken
//! under the registry lock.

pub mod bundle;
pub mod manager;
pub mod model;
pub mod storage;

pub use bundle::{ERROR_REPORT_NAME, build_bundle, error_report};
pub use manager::{JobManager, Upload};
pub use model::{FileError, Job, JobStatus};
pub use storage::{JobStorage, SweepReport};
