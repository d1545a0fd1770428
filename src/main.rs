use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docreflow::jobs::{Job, JobManager, JobStatus, Upload};
use docreflow::Config;

#[derive(Parser)]
#[command(name = "docreflow")]
#[command(about = "Rebuild .docx documents into a fixed house template")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Template TOML to use instead of the configured or built-in one
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    /// Storage root for uploads and outputs
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Reconstruct one or more documents as a single job
    Process {
        /// Input files (.docx or .pdf)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Where to write the result (a .docx for one input, else a .zip bundle)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the job's storage after writing the result
        #[arg(long)]
        keep: bool,
    },
    /// Remove job storage older than the configured max age
    Sweep,
    /// Write the default config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "docreflow=debug"
    } else {
        "docreflow=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    if let Command::InitConfig = cli.command {
        match Config::init_default()? {
            Some(path) => println!("Wrote default config to {}", path.display()),
            None => println!("No config directory available on this platform"),
        }
        return Ok(());
    }

    let mut config = Config::load().context("Failed to load config")?;
    if let Some(template) = cli.template {
        config.template = Some(template);
    }
    if let Some(storage) = cli.storage {
        config.storage_root = storage;
    }

    let manager = JobManager::from_config(&config);
    let report = manager.sweep_expired(config.max_age());
    info!(removed = report.removed, failed = report.failed, "Startup sweep");

    match cli.command {
        Command::Process {
            files,
            output,
            keep,
        } => {
            let sweeper = config
                .sweep_interval()
                .map(|interval| manager.spawn_sweeper(interval, config.max_age()));
            let result = process(&manager, &files, output.as_deref(), keep).await;
            if let Some(sweeper) = sweeper {
                sweeper.abort();
            }
            result
        }
        Command::Sweep => {
            println!(
                "Removed {} expired entr{} under {}",
                report.removed,
                if report.removed == 1 { "y" } else { "ies" },
                manager.storage().root().display()
            );
            Ok(())
        }
        Command::InitConfig => Ok(()),
    }
}

async fn process(
    manager: &JobManager,
    files: &[PathBuf],
    output: Option<&Path>,
    keep: bool,
) -> Result<()> {
    let uploads = files
        .iter()
        .map(|path| Upload::from_path(path).with_context(|| format!("Failed to read {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let job_id = manager.submit(uploads).await?;
    let job = manager.wait(job_id).await?;
    println!("{}", serde_json::to_string_pretty(&job)?);

    let written = write_result(manager, &job, output);

    if keep {
        info!(%job_id, root = %manager.storage().root().display(), "Keeping job storage");
    } else if let Err(e) = manager.delete(job_id) {
        warn!(%job_id, "Failed to delete job: {e}");
    }

    let path = written?;
    if job.status == JobStatus::Failed {
        bail!(
            "Job failed: {}",
            job.error.as_deref().unwrap_or("no document could be processed")
        );
    }
    if let Some(path) = path {
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

/// Write the single output, or the bundle when there is more than one file
fn write_result(manager: &JobManager, job: &Job, output: Option<&Path>) -> Result<Option<PathBuf>> {
    if job.status != JobStatus::Completed {
        return Ok(None);
    }

    let (path, bytes) = match job.outputs.as_slice() {
        [single] if job.inputs.len() == 1 => {
            let path = output.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(single));
            (path, manager.fetch(job.id, single)?)
        }
        _ => {
            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(format!("docreflow-{}.zip", job.id)));
            (path, manager.fetch_bundle(job.id)?)
        }
    };

    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(Some(path))
}
