//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `CITEFLOW_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::constants::{
    ARTICLES_CSV, ARTICLES_SNAPSHOT, CITATIONS_CSV, CITATIONS_SNAPSHOT, CROSSREF_CSV,
    CROSSREF_SNAPSHOT, DEFAULT_API_TIMEOUT_SECS, DEFAULT_BASE_WAIT_SECS, DEFAULT_BATCH_SIZE,
    DEFAULT_CAP_WAIT_SECS, DEFAULT_CHECKPOINT_EVERY, DEFAULT_FETCH_WORKERS,
    DEFAULT_INFERENCE_WORKERS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_ABSTRACT_CHARS,
    DEFAULT_PAGE_TIMEOUT_SECS, DEFAULT_USER_AGENT, SCORED_CSV, SCORES_SNAPSHOT, UNIFIED_ARCHIVE,
    UNIFIED_CSV,
};
use crate::retry::RetryPolicy;

/// Pipeline configuration loaded from environment variables.
///
/// Use [`PipelineConfig::from_env`] to read `CITEFLOW_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input CSV exported from the journal's web interface.
    pub input_csv: PathBuf,

    /// Directory for CSV outputs. Default: `./output_data`.
    pub output_dir: PathBuf,

    /// Directory for cache snapshots. Default: `./cache`.
    pub cache_dir: PathBuf,

    /// Optional `key: value` credentials file.
    pub credentials_path: PathBuf,

    /// Contact address appended to Crossref queries as `mailto`.
    pub crossref_mailto: Option<String>,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Path to the NLI model directory (config.json + model.safetensors + tokenizer.json).
    pub model_path: Option<PathBuf>,

    pub fetch_workers: usize,
    pub inference_workers: usize,
    pub batch_size: usize,

    pub max_attempts: u32,
    pub base_wait: Duration,
    pub cap_wait: Duration,

    pub page_timeout: Duration,
    pub api_timeout: Duration,

    /// Completed units between snapshots.
    pub checkpoint_every: usize,

    pub min_abstract_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_csv: PathBuf::from("./input_data/apsr_results.csv"),
            output_dir: PathBuf::from("./output_data"),
            cache_dir: PathBuf::from("./cache"),
            credentials_path: PathBuf::from("./credentials.txt"),
            crossref_mailto: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            model_path: None,
            fetch_workers: DEFAULT_FETCH_WORKERS,
            inference_workers: DEFAULT_INFERENCE_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_wait: Duration::from_secs(DEFAULT_BASE_WAIT_SECS),
            cap_wait: Duration::from_secs(DEFAULT_CAP_WAIT_SECS),
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
            api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            min_abstract_chars: DEFAULT_MIN_ABSTRACT_CHARS,
        }
    }
}

impl PipelineConfig {
    const ENV_INPUT_CSV: &'static str = "CITEFLOW_INPUT_CSV";
    const ENV_OUTPUT_DIR: &'static str = "CITEFLOW_OUTPUT_DIR";
    const ENV_CACHE_DIR: &'static str = "CITEFLOW_CACHE_DIR";
    const ENV_CREDENTIALS_PATH: &'static str = "CITEFLOW_CREDENTIALS_PATH";
    const ENV_CROSSREF_MAILTO: &'static str = "CITEFLOW_CROSSREF_MAILTO";
    const ENV_USER_AGENT: &'static str = "CITEFLOW_USER_AGENT";
    const ENV_MODEL_PATH: &'static str = "CITEFLOW_MODEL_PATH";
    const ENV_FETCH_WORKERS: &'static str = "CITEFLOW_FETCH_WORKERS";
    const ENV_INFERENCE_WORKERS: &'static str = "CITEFLOW_INFERENCE_WORKERS";
    const ENV_BATCH_SIZE: &'static str = "CITEFLOW_BATCH_SIZE";
    const ENV_MAX_ATTEMPTS: &'static str = "CITEFLOW_MAX_ATTEMPTS";
    const ENV_BASE_WAIT_SECS: &'static str = "CITEFLOW_BASE_WAIT_SECS";
    const ENV_CAP_WAIT_SECS: &'static str = "CITEFLOW_CAP_WAIT_SECS";
    const ENV_PAGE_TIMEOUT_SECS: &'static str = "CITEFLOW_PAGE_TIMEOUT_SECS";
    const ENV_API_TIMEOUT_SECS: &'static str = "CITEFLOW_API_TIMEOUT_SECS";
    const ENV_CHECKPOINT_EVERY: &'static str = "CITEFLOW_CHECKPOINT_EVERY";
    const ENV_MIN_ABSTRACT_CHARS: &'static str = "CITEFLOW_MIN_ABSTRACT_CHARS";

    /// Loads configuration from environment variables (falling back to defaults).
    ///
    /// When no `CITEFLOW_CROSSREF_MAILTO` is set, the `email` entry of the credentials
    /// file is used if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let credentials_path =
            Self::parse_path_from_env(Self::ENV_CREDENTIALS_PATH, defaults.credentials_path);
        let crossref_mailto = Self::parse_optional_string_from_env(Self::ENV_CROSSREF_MAILTO)
            .or_else(|| load_credentials(&credentials_path).remove("email"))
            .filter(|email| !email.is_empty());

        Ok(Self {
            input_csv: Self::parse_path_from_env(Self::ENV_INPUT_CSV, defaults.input_csv),
            output_dir: Self::parse_path_from_env(Self::ENV_OUTPUT_DIR, defaults.output_dir),
            cache_dir: Self::parse_path_from_env(Self::ENV_CACHE_DIR, defaults.cache_dir),
            credentials_path,
            crossref_mailto,
            user_agent: Self::parse_optional_string_from_env(Self::ENV_USER_AGENT)
                .unwrap_or(defaults.user_agent),
            model_path: Self::parse_optional_string_from_env(Self::ENV_MODEL_PATH)
                .map(PathBuf::from),
            fetch_workers: Self::parse_number_from_env(
                Self::ENV_FETCH_WORKERS,
                defaults.fetch_workers,
            )?,
            inference_workers: Self::parse_number_from_env(
                Self::ENV_INFERENCE_WORKERS,
                defaults.inference_workers,
            )?,
            batch_size: Self::parse_number_from_env(Self::ENV_BATCH_SIZE, defaults.batch_size)?,
            max_attempts: Self::parse_number_from_env(
                Self::ENV_MAX_ATTEMPTS,
                defaults.max_attempts,
            )?,
            base_wait: Self::parse_secs_from_env(Self::ENV_BASE_WAIT_SECS, defaults.base_wait)?,
            cap_wait: Self::parse_secs_from_env(Self::ENV_CAP_WAIT_SECS, defaults.cap_wait)?,
            page_timeout: Self::parse_secs_from_env(
                Self::ENV_PAGE_TIMEOUT_SECS,
                defaults.page_timeout,
            )?,
            api_timeout: Self::parse_secs_from_env(
                Self::ENV_API_TIMEOUT_SECS,
                defaults.api_timeout,
            )?,
            checkpoint_every: Self::parse_number_from_env(
                Self::ENV_CHECKPOINT_EVERY,
                defaults.checkpoint_every,
            )?,
            min_abstract_chars: Self::parse_number_from_env(
                Self::ENV_MIN_ABSTRACT_CHARS,
                defaults.min_abstract_chars,
            )?,
        })
    }

    /// Validates basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("fetch_workers", self.fetch_workers),
            ("inference_workers", self.inference_workers),
            ("batch_size", self.batch_size),
            ("max_attempts", self.max_attempts as usize),
            ("checkpoint_every", self.checkpoint_every),
        ];
        if let Some(&(name, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero { name });
        }

        if self.base_wait > self.cap_wait {
            return Err(ConfigError::WaitOrder {
                base_secs: self.base_wait.as_secs(),
                cap_secs: self.cap_wait.as_secs(),
            });
        }

        for dir in [&self.output_dir, &self.cache_dir] {
            if dir.exists() && !dir.is_dir() {
                return Err(ConfigError::NotADirectory { path: dir.clone() });
            }
        }

        if let Some(ref path) = self.model_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        Ok(())
    }

    /// Retry policy shared by every remote call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.base_wait, self.cap_wait)
    }

    pub fn citations_snapshot(&self) -> PathBuf {
        self.cache_dir.join(CITATIONS_SNAPSHOT)
    }

    pub fn articles_snapshot(&self) -> PathBuf {
        self.cache_dir.join(ARTICLES_SNAPSHOT)
    }

    pub fn crossref_snapshot(&self) -> PathBuf {
        self.cache_dir.join(CROSSREF_SNAPSHOT)
    }

    pub fn scores_snapshot(&self) -> PathBuf {
        self.cache_dir.join(SCORES_SNAPSHOT)
    }

    pub fn unified_archive(&self) -> PathBuf {
        self.cache_dir.join(UNIFIED_ARCHIVE)
    }

    pub fn citations_csv(&self) -> PathBuf {
        self.output_dir.join(CITATIONS_CSV)
    }

    pub fn articles_csv(&self) -> PathBuf {
        self.output_dir.join(ARTICLES_CSV)
    }

    pub fn crossref_csv(&self) -> PathBuf {
        self.output_dir.join(CROSSREF_CSV)
    }

    pub fn unified_csv(&self) -> PathBuf {
        self.output_dir.join(UNIFIED_CSV)
    }

    pub fn scored_csv(&self) -> PathBuf {
        self.output_dir.join(SCORED_CSV)
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_number_from_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr<Err = std::num::ParseIntError>,
    {
        match env::var(name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidNumber {
                    name,
                    value,
                    source,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_secs_from_env(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        Self::parse_number_from_env(name, default.as_secs()).map(Duration::from_secs)
    }
}

/// Reads a `key: value` credentials file.
///
/// A missing file yields an empty map. Malformed lines are logged and skipped.
pub fn load_credentials(path: &Path) -> HashMap<String, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No credentials loaded");
            return HashMap::new();
        }
    };

    let mut credentials = HashMap::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) => {
                credentials.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => warn!(
                path = %path.display(),
                line = idx + 1,
                "Skipping malformed credentials line"
            ),
        }
    }
    credentials
}
