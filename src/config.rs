//! Runtime configuration for shipwright
//!
//! Settings are loaded from environment variables with sensible defaults.
//! They describe how the tool runs (worker count, retry policy, scan bounds),
//! not what a single migration produces; per-job settings live in
//! [`MigrationConfiguration`](crate::model::MigrationConfiguration).
//!
//! # Environment Variables
//!
//! - `SHIPWRIGHT_WORKERS`: Parallel jobs - default: "3"
//! - `SHIPWRIGHT_MAX_ATTEMPTS`: Attempts per stage - default: "3"
//! - `SHIPWRIGHT_BACKOFF_MS`: First retry delay - default: "500"
//! - `SHIPWRIGHT_BACKOFF_MAX_MS`: Retry delay cap - default: "10000"
//! - `SHIPWRIGHT_STAGE_TIMEOUT`: Per-stage timeout in seconds - default: "600"
//! - `SHIPWRIGHT_TIMEOUT_STRUCTURAL`: Fail instead of retrying on timeout - default: "false"
//! - `SHIPWRIGHT_SCAN_DEPTH`: Maximum scan depth - default: "6"
//! - `SHIPWRIGHT_SCAN_MAX_FILES`: Maximum files inspected per scan - default: "5000"
//! - `SHIPWRIGHT_PRESET_DIR`: Directory of configuration presets - default: user config dir
//! - `SHIPWRIGHT_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use shipwright::ShipwrightConfig;
//!
//! let config = ShipwrightConfig::default().with_workers(4);
//! config.validate().expect("Invalid configuration");
//! let retry = config.retry_policy();
//! assert_eq!(retry.max_attempts, config.max_attempts);
//! ```

use crate::pipeline::{DriverConfig, RetryPolicy};
use crate::scan::ScanConfig;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_WORKERS: usize = 3;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 500;
const DEFAULT_BACKOFF_MAX_MS: u64 = 10_000;
const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_SCAN_DEPTH: usize = 6;
const DEFAULT_SCAN_MAX_FILES: usize = 5000;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipwrightConfig {
    /// Maximum number of jobs driven at the same time
    pub workers: usize,

    /// Attempts per stage before a transient failure becomes fatal
    pub max_attempts: u32,

    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,

    pub stage_timeout_secs: u64,

    /// Treat a stage timeout as fatal rather than transient
    pub timeout_is_structural: bool,

    pub scan_max_depth: usize,
    pub scan_max_files: usize,

    /// Where named configuration presets are stored
    pub preset_dir: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Default for ShipwrightConfig {
    /// Loads from `SHIPWRIGHT_*` environment variables; unset or
    /// unparseable values fall back to the defaults
    fn default() -> Self {
        let preset_dir = env::var("SHIPWRIGHT_PRESET_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("shipwright").join("presets")));

        let log_level = env::var("SHIPWRIGHT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            workers: env_or("SHIPWRIGHT_WORKERS", DEFAULT_WORKERS),
            max_attempts: env_or("SHIPWRIGHT_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            backoff_base_ms: env_or("SHIPWRIGHT_BACKOFF_MS", DEFAULT_BACKOFF_MS),
            backoff_max_ms: env_or("SHIPWRIGHT_BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            stage_timeout_secs: env_or("SHIPWRIGHT_STAGE_TIMEOUT", DEFAULT_STAGE_TIMEOUT_SECS),
            timeout_is_structural: env_or("SHIPWRIGHT_TIMEOUT_STRUCTURAL", false),
            scan_max_depth: env_or("SHIPWRIGHT_SCAN_DEPTH", DEFAULT_SCAN_DEPTH),
            scan_max_files: env_or("SHIPWRIGHT_SCAN_MAX_FILES", DEFAULT_SCAN_MAX_FILES),
            preset_dir,
            log_level,
        }
    }
}

impl ShipwrightConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=64).contains(&self.workers) {
            return Err(ConfigError::ValidationFailed(format!(
                "Worker count must be between 1 and 64, got {}",
                self.workers
            )));
        }

        if !(1..=10).contains(&self.max_attempts) {
            return Err(ConfigError::ValidationFailed(format!(
                "Max attempts must be between 1 and 10, got {}",
                self.max_attempts
            )));
        }

        if self.stage_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Stage timeout must be at least 1 second".to_string(),
            ));
        }
        if self.stage_timeout_secs > 3600 {
            return Err(ConfigError::ValidationFailed(
                "Stage timeout cannot exceed 1 hour".to_string(),
            ));
        }

        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(ConfigError::ValidationFailed(format!(
                "Backoff base ({}ms) cannot exceed backoff max ({}ms)",
                self.backoff_base_ms, self.backoff_max_ms
            )));
        }

        if self.scan_max_depth == 0 {
            return Err(ConfigError::ValidationFailed(
                "Scan depth must be at least 1".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_stage_timeout_secs(mut self, secs: u64) -> Self {
        self.stage_timeout_secs = secs;
        self
    }

    pub fn with_scan_max_depth(mut self, depth: usize) -> Self {
        self.scan_max_depth = depth;
        self
    }

    pub fn with_preset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preset_dir = Some(dir.into());
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into().to_lowercase();
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.max_attempts)
            .with_backoff(
                Duration::from_millis(self.backoff_base_ms),
                Duration::from_millis(self.backoff_max_ms),
            )
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig::new()
            .with_retry(self.retry_policy())
            .with_stage_timeout(Duration::from_secs(self.stage_timeout_secs))
            .with_timeout_structural(self.timeout_is_structural)
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            max_depth: self.scan_max_depth,
            max_files: self.scan_max_files,
            ..ScanConfig::default()
        }
    }

    /// Preset directory, or an error naming the variable to set
    pub fn require_preset_dir(&self) -> Result<PathBuf, ConfigError> {
        self.preset_dir.clone().ok_or_else(|| ConfigError::ParseError {
            field: "SHIPWRIGHT_PRESET_DIR".to_string(),
            error: "no preset directory configured and no user config dir available".to_string(),
        })
    }
}

impl fmt::Display for ShipwrightConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Shipwright Configuration:")?;
        writeln!(f, "  Workers: {}", self.workers)?;
        writeln!(f, "  Max Attempts: {}", self.max_attempts)?;
        writeln!(
            f,
            "  Backoff: {}ms (max {}ms)",
            self.backoff_base_ms, self.backoff_max_ms
        )?;
        writeln!(
            f,
            "  Stage Timeout: {}s{}",
            self.stage_timeout_secs,
            if self.timeout_is_structural {
                " (fatal)"
            } else {
                ""
            }
        )?;
        writeln!(
            f,
            "  Scan Limits: depth {}, {} files",
            self.scan_max_depth, self.scan_max_files
        )?;
        if let Some(ref dir) = self.preset_dir {
            writeln!(f, "  Preset Dir: {}", dir.display())?;
        }
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
