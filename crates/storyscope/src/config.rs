//! Configuration parsing
//!
//! Reads `<home>/config.toml`. Every section and field is optional; a
//! missing file means all defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use storyscope_batch::policy::{
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_FILE_BYTES,
};
use storyscope_batch::{OrchestratorConfig, PipelineConfig, UploadPolicy};

pub const CONFIG_FILE: &str = "config.toml";

/// Error type for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoryscopeConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

/// Directory overrides. Relative paths resolve against the home directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
    pub uploads_dir: Option<PathBuf>,
    pub records_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_file_bytes: default_max_file_bytes(),
            max_batch_bytes: default_max_batch_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_cleanup_grace_secs")]
    pub cleanup_grace_secs: u64,
    #[serde(default = "default_cleanup_poll_secs")]
    pub cleanup_poll_secs: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            cleanup_grace_secs: default_cleanup_grace_secs(),
            cleanup_poll_secs: default_cleanup_poll_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryConfig {
    /// 0 disables stale-processing recovery.
    #[serde(default = "default_stale_processing_after_secs")]
    pub stale_processing_after_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            stale_processing_after_secs: default_stale_processing_after_secs(),
        }
    }
}

/// External analyzer command: `<program> <args..> <path> <mime>`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_analyzer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_secs: default_analyzer_timeout_secs(),
        }
    }
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_FILE_BYTES
}

fn default_max_batch_bytes() -> u64 {
    DEFAULT_MAX_BATCH_BYTES
}

fn default_cleanup_grace_secs() -> u64 {
    1800
}

fn default_cleanup_poll_secs() -> u64 {
    60
}

fn default_stale_processing_after_secs() -> u64 {
    3600
}

fn default_analyzer_timeout_secs() -> u64 {
    600
}

/// Resolved directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub records_dir: PathBuf,
}

impl StoryscopeConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.upload.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "upload.allowed_extensions must not be empty".to_string(),
            ));
        }
        if self.upload.max_file_bytes == 0 || self.upload.max_batch_bytes == 0 {
            return Err(ConfigError::Invalid(
                "upload size limits must be greater than zero".to_string(),
            ));
        }
        if self.pipeline.cleanup_poll_secs == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.cleanup_poll_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn paths(&self, home: &Path) -> Paths {
        let resolve = |value: &Option<PathBuf>, default: &str| match value {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => home.join(p),
            None => home.join(default),
        };
        Paths {
            data_dir: resolve(&self.storage.data_dir, "data"),
            uploads_dir: resolve(&self.storage.uploads_dir, "uploads"),
            records_dir: resolve(&self.storage.records_dir, "records"),
        }
    }

    pub fn orchestrator_config(&self, home: &Path) -> OrchestratorConfig {
        let paths = self.paths(home);
        let stale = self.recovery.stale_processing_after_secs;
        OrchestratorConfig {
            data_dir: paths.data_dir,
            uploads_dir: paths.uploads_dir,
            policy: UploadPolicy::new(
                &self.upload.allowed_extensions,
                self.upload.max_file_bytes,
                self.upload.max_batch_bytes,
            ),
            pipeline: PipelineConfig {
                cleanup_grace: Duration::from_secs(self.pipeline.cleanup_grace_secs),
                cleanup_poll: Duration::from_secs(self.pipeline.cleanup_poll_secs),
            },
            stale_processing_after: (stale > 0).then(|| Duration::from_secs(stale)),
        }
    }
}

/// Load `<home>/config.toml`, or defaults when it does not exist.
pub fn load_config(home: &Path) -> Result<StoryscopeConfig> {
    let path = home.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(StoryscopeConfig::default());
    }
    let content = std::fs::read_to_string(&path)?;
    StoryscopeConfig::parse(&content)
}
