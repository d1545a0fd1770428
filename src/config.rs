use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides the default storage root
pub const WORKSPACE_ENV: &str = "DOCREFLOW_WORKSPACE";

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;
const DEFAULT_MAX_AGE_HOURS: u64 = 24;
const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `uploads/` and `outputs/`
    pub storage_root: PathBuf,
    /// Template TOML; the built-in template is used when unset
    pub template: Option<PathBuf>,
    pub max_upload_bytes: u64,
    /// Job storage older than this is removed by the sweep
    pub max_age_hours: u64,
    /// Run the sweep periodically as well as at startup
    pub sweep_interval_minutes: Option<u64>,
    /// Jobs processed at the same time; later submissions wait as PENDING
    pub max_concurrent_jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: Self::default_storage_root(),
            template: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
            sweep_interval_minutes: None,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
        }
    }
}

impl Config {
    /// Load config from the config directory, falling back to defaults
    pub fn load() -> Result<Self> {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                let content = fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Save config to the config directory
    pub fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::config_path() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let content = toml::to_string_pretty(self)?;
            fs::write(&config_path, content)?;
        }

        Ok(())
    }

    /// Get the path to the config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docreflow").join("config.toml"))
    }

    /// Write the default config file and return where it went
    pub fn init_default() -> Result<Option<PathBuf>> {
        Config::default().save()?;
        Ok(Self::config_path())
    }

    fn default_storage_root() -> PathBuf {
        if let Some(dir) = std::env::var_os(WORKSPACE_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("docreflow"))
            .unwrap_or_else(|| PathBuf::from("docreflow-data"))
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours * 3600)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_minutes
            .filter(|&minutes| minutes > 0)
            .map(|minutes| Duration::from_secs(minutes * 60))
    }
}
