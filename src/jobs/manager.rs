use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::bundle::build_bundle;
use super::model::Job;
use super::storage::{JobStorage, SweepReport};
use crate::config::Config;
use crate::document::SourceKind;
use crate::error::{ReflowError, Result};
use crate::pipeline::{PdfNormalizer, output_name, reconstruct_file};
use crate::reconstruct::TemplateSource;

type Registry = Arc<Mutex<HashMap<Uuid, Job>>>;
type Tasks = Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>;

const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One uploaded file
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }

    /// Read an upload from disk, named after the file
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(filename, std::fs::read(path)?))
    }
}

/// Everything the background task needs, cloned out of the manager
struct RunContext {
    registry: Registry,
    storage: Arc<JobStorage>,
    template: TemplateSource,
    normalizer: Option<Arc<dyn PdfNormalizer>>,
}

/// Owns the job registry and runs one background task per job
pub struct JobManager {
    registry: Registry,
    tasks: Tasks,
    /// One permit per job allowed to run at once
    gate: Arc<Semaphore>,
    storage: Arc<JobStorage>,
    template: TemplateSource,
    max_upload_bytes: u64,
    normalizer: Option<Arc<dyn PdfNormalizer>>,
}

impl JobManager {
    pub fn new(storage: JobStorage, template: TemplateSource, max_upload_bytes: u64) -> Self {
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            gate: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_JOBS)),
            storage: Arc::new(storage),
            template,
            max_upload_bytes,
            normalizer: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            JobStorage::new(&config.storage_root),
            TemplateSource::from_option(config.template.clone()),
            config.max_upload_bytes,
        )
        .with_max_concurrent_jobs(config.max_concurrent_jobs)
    }

    /// Limit how many jobs process at once; zero is treated as one
    pub fn with_max_concurrent_jobs(mut self, limit: usize) -> Self {
        self.gate = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    /// Route PDF inputs through `normalizer`
    pub fn with_pdf_normalizer(mut self, normalizer: Arc<dyn PdfNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn storage(&self) -> &JobStorage {
        &self.storage
    }

    pub fn job_count(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Reject bad uploads before any job exists
    fn validate_uploads(&self, uploads: &[Upload]) -> Result<()> {
        if uploads.is_empty() {
            return Err(ReflowError::NoFiles);
        }

        let mut seen_outputs = HashSet::new();
        for upload in uploads {
            let filename = &upload.filename;
            let is_plain_name = Path::new(filename)
                .file_name()
                .is_some_and(|name| name == filename.as_str());
            if filename.trim().is_empty() || !is_plain_name {
                return Err(ReflowError::InvalidFileName {
                    filename: filename.clone(),
                });
            }
            if upload.data.is_empty() {
                return Err(ReflowError::EmptyFile {
                    filename: filename.clone(),
                });
            }
            let size = upload.data.len() as u64;
            if size > self.max_upload_bytes {
                return Err(ReflowError::FileTooLarge {
                    filename: filename.clone(),
                    size,
                    limit: self.max_upload_bytes,
                });
            }
            if SourceKind::from_path(Path::new(filename)).is_none() {
                return Err(ReflowError::UnsupportedFileType {
                    filename: filename.clone(),
                });
            }
            // a.docx and a.pdf would both become processed_a.docx
            if !seen_outputs.insert(output_name(filename)) {
                return Err(ReflowError::DuplicateFileName {
                    filename: filename.clone(),
                });
            }
        }
        Ok(())
    }

    /// Register a PENDING job and provision its storage
    pub fn create_job(&self, inputs: Vec<String>) -> Result<Uuid> {
        let job = Job::new(inputs);
        let job_id = job.id;
        self.storage.provision(job_id)?;
        lock(&self.registry).insert(job_id, job);
        debug!(%job_id, "Created job");
        Ok(job_id)
    }

    /// Accept uploads, persist them and start processing in the background
    ///
    /// Returns as soon as the bytes are on disk; the job is still PENDING.
    pub async fn submit(&self, uploads: Vec<Upload>) -> Result<Uuid> {
        self.validate_uploads(&uploads)?;

        let inputs = uploads.iter().map(|u| u.filename.clone()).collect();
        let job_id = self.create_job(inputs)?;

        let upload_dir = self.storage.upload_dir(job_id);
        for upload in &uploads {
            if let Err(e) = tokio::fs::write(upload_dir.join(&upload.filename), &upload.data).await {
                error!(%job_id, file = %upload.filename, "Failed to store upload: {e}");
                lock(&self.registry).remove(&job_id);
                if let Err(e) = self.storage.remove(job_id) {
                    warn!(%job_id, "Failed to clean up job storage: {e}");
                }
                return Err(e.into());
            }
        }

        info!(%job_id, files = uploads.len(), "Accepted job");
        self.spawn_job(job_id);
        Ok(job_id)
    }

    fn spawn_job(&self, job_id: Uuid) {
        let context = RunContext {
            registry: Arc::clone(&self.registry),
            storage: Arc::clone(&self.storage),
            template: self.template.clone(),
            normalizer: self.normalizer.clone(),
        };
        let gate = Arc::clone(&self.gate);
        let handle = tokio::spawn(async move {
            // The job stays PENDING until a slot frees up
            let Ok(_permit) = gate.acquire_owned().await else {
                warn!(%job_id, "Job gate closed before the job could start");
                return;
            };
            if let Err(e) = tokio::task::spawn_blocking(move || run_job(&context, job_id)).await {
                error!(%job_id, "Job task ended abnormally: {e}");
            }
        });

        let mut tasks = lock(&self.tasks);
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.insert(job_id, handle);
    }

    /// Snapshot of the job record
    pub fn status(&self, job_id: Uuid) -> Result<Job> {
        lock(&self.registry)
            .get(&job_id)
            .cloned()
            .ok_or(ReflowError::JobNotFound(job_id))
    }

    fn terminal_job(&self, job_id: Uuid) -> Result<Job> {
        let job = self.status(job_id)?;
        if !job.is_terminal() {
            return Err(ReflowError::JobNotCompleted {
                job_id,
                status: job.status.to_string(),
            });
        }
        Ok(job)
    }

    /// Bytes of one output document
    pub fn fetch(&self, job_id: Uuid, filename: &str) -> Result<Vec<u8>> {
        let job = self.terminal_job(job_id)?;
        let not_found = || ReflowError::OutputNotFound {
            job_id,
            filename: filename.to_string(),
        };
        if !job.outputs.iter().any(|output| output == filename) {
            return Err(not_found());
        }
        std::fs::read(self.storage.output_dir(job_id).join(filename)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => not_found(),
            _ => ReflowError::Io(e),
        })
    }

    /// Zip of all outputs, the images subtree and the error report
    pub fn fetch_bundle(&self, job_id: Uuid) -> Result<Vec<u8>> {
        let job = self.terminal_job(job_id)?;
        build_bundle(&job, &self.storage.output_dir(job_id))
    }

    /// Drop the job record and its storage
    ///
    /// Deleting a job that is still processing is best effort: the background
    /// task keeps running and its writes may recreate files that the next
    /// sweep removes.
    pub fn delete(&self, job_id: Uuid) -> Result<()> {
        let job = lock(&self.registry)
            .remove(&job_id)
            .ok_or(ReflowError::JobNotFound(job_id))?;
        if !job.is_terminal() {
            warn!(%job_id, status = %job.status, "Deleting a job that has not finished");
        }
        lock(&self.tasks).remove(&job_id);
        self.storage.remove(job_id)?;
        info!(%job_id, "Deleted job");
        Ok(())
    }

    /// Wait for the job's background task, then return its record
    pub async fn wait(&self, job_id: Uuid) -> Result<Job> {
        let handle = lock(&self.tasks).remove(&job_id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(%job_id, "Job task failed to join: {e}");
            }
        }
        self.status(job_id)
    }

    /// Remove expired storage and finished records older than `max_age`
    pub fn sweep_expired(&self, max_age: Duration) -> SweepReport {
        let report = self.storage.sweep_expired(max_age);
        prune_records(&self.registry, &self.tasks, max_age);
        report
    }

    /// Run the sweep every `interval` until the returned handle is aborted
    pub fn spawn_sweeper(&self, interval: Duration, max_age: Duration) -> JoinHandle<()> {
        let storage = Arc::clone(&self.storage);
        let registry = Arc::clone(&self.registry);
        let tasks = Arc::clone(&self.tasks);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately and startup already swept
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let storage = Arc::clone(&storage);
                match tokio::task::spawn_blocking(move || storage.sweep_expired(max_age)).await {
                    Ok(report) => {
                        prune_records(&registry, &tasks, max_age);
                        if report.removed > 0 || report.failed > 0 {
                            info!(removed = report.removed, failed = report.failed, "Periodic sweep");
                        }
                    }
                    Err(e) => error!("Sweep task failed: {e}"),
                }
            }
        })
    }
}

/// Forget finished jobs whose storage the sweep has reclaimed, and the
/// handles of tasks that have already ended
fn prune_records(registry: &Registry, tasks: &Tasks, max_age: Duration) {
    if let Ok(max_age) = chrono::Duration::from_std(max_age) {
        let now = Utc::now();
        lock(registry).retain(|_, job| {
            job.finished_at
                .is_none_or(|finished| now.signed_duration_since(finished) <= max_age)
        });
    }
    lock(tasks).retain(|_, handle| !handle.is_finished());
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Apply a change to the job record, unless the job was deleted meanwhile
fn update_job(registry: &Registry, job_id: Uuid, apply: impl FnOnce(&mut Job)) {
    match lock(registry).get_mut(&job_id) {
        Some(job) => apply(job),
        None => debug!(%job_id, "Job deleted while processing; dropping update"),
    }
}

/// Background body of one job: every file in turn, each in its own boundary
fn run_job(context: &RunContext, job_id: Uuid) {
    let inputs = {
        let mut registry = lock(&context.registry);
        let Some(job) = registry.get_mut(&job_id) else {
            warn!(%job_id, "Job vanished before processing started");
            return;
        };
        job.start();
        job.inputs.clone()
    };
    info!(%job_id, files = inputs.len(), "Processing job");

    let template = match context.template.load() {
        Ok(template) => template,
        Err(e) => {
            let reason = ReflowError::Template(format!("{e:#}")).to_string();
            error!(%job_id, "{reason}");
            update_job(&context.registry, job_id, |job| job.fail(reason));
            return;
        }
    };

    let upload_dir = context.storage.upload_dir(job_id);
    let output_dir = context.storage.output_dir(job_id);
    if let Err(e) = std::fs::create_dir_all(&output_dir) {
        let reason = format!("Failed to prepare output directory: {e}");
        error!(%job_id, "{reason}");
        update_job(&context.registry, job_id, |job| job.fail(reason));
        return;
    }

    for filename in inputs {
        let input = upload_dir.join(&filename);
        let normalizer = context.normalizer.as_deref();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            reconstruct_file(&input, &template, &output_dir, normalizer)
        }));

        match outcome {
            Ok(Ok(output)) => {
                update_job(&context.registry, job_id, |job| job.record_output(output.output_name));
            }
            Ok(Err(e)) => {
                let reason = format!("{e:#}");
                warn!(%job_id, file = %filename, "File failed: {reason}");
                update_job(&context.registry, job_id, |job| job.record_error(filename, reason));
            }
            Err(payload) => {
                let reason = format!("Processing aborted: {}", panic_message(payload.as_ref()));
                error!(%job_id, file = %filename, "{reason}");
                update_job(&context.registry, job_id, |job| job.record_error(filename, reason));
            }
        }
    }

    update_job(&context.registry, job_id, |job| {
        job.finish();
        info!(
            %job_id,
            status = %job.status,
            outputs = job.outputs.len(),
            errors = job.errors.len(),
            "Job finished"
        );
    });
}
