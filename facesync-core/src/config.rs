//! YAML config file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.facesync/
//!   config.yaml   (mode 0600, optional; defaults apply when absent)
//! ```
//!
//! # API pattern
//!
//! Every function touching disk has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

pub const CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8787";
/// The directory accepts 60 photo uploads per minute per user.
pub const DEFAULT_UPLOAD_INTERVAL_MS: u64 = 1500;

// ---------------------------------------------------------------------------
// 1. Types
// ---------------------------------------------------------------------------

/// Retry policy for collaborator calls that fail with a recoverable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl RetryConfig {
    /// Backoff before attempt `attempt + 1`, doubling from the initial value
    /// and capped at `max_backoff_ms`. `attempt` is 1-based.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub upload_interval_ms: u64,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8787))),
            upload_interval_ms: DEFAULT_UPLOAD_INTERVAL_MS,
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    pub fn upload_interval(&self) -> Duration {
        Duration::from_millis(self.upload_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "upload_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.max_backoff_ms ({}) is below retry.initial_backoff_ms ({})",
                self.retry.max_backoff_ms, self.retry.initial_backoff_ms
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 2. Paths
// ---------------------------------------------------------------------------

/// `<home>/.facesync/`
pub fn facesync_root(home: &Path) -> PathBuf {
    home.join(".facesync")
}

/// `<home>/.facesync/config.yaml`, pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    facesync_root(home).join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load and validate `<home>/.facesync/config.yaml`.
///
/// A missing file yields [`Config::default`]. Returns `ConfigError::Parse`
/// (with path) on malformed YAML and `ConfigError::Invalid` on bad values.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let config: Config =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 4. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `<home>/.facesync/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<PathBuf, ConfigError> {
    config.validate()?;
    let root = facesync_root(home);
    if !root.exists() {
        std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name(format!("{CONFIG_FILE}.tmp"));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(&path, e));
    }
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// 5. Helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}
