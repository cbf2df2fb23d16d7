//! Configuration loading traits and types.
//!
//! All barn configuration is TOML. A configuration directory holds:
//!
//! - `config.toml` - `[shared]`, `[control]` and `[[interlock]]` sections
//! - `equipment.toml` - `[[equipment]]` records
//! - `io.toml` - simulated point table (optional)
//!
//! # Usage
//!
//! ```rust,no_run
//! use barn_common::config::{load_config_dir, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = load_config_dir(Path::new("/etc/barn/config"))?;
//!     println!("{} equipment", config.equipment.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{
    DEFAULT_INTERLOCK_TIMEOUT_MS, DEFAULT_IO_TIMEOUT_MS, DEFAULT_MAILBOX_CAPACITY,
    DEFAULT_RESTART_DELAY_MS, DEFAULT_STATUS_REPORT_INTERVAL_S,
};
use crate::equipment::config::EquipmentConfig;
use crate::hal::config::SimBusConfig;

/// File names inside a configuration directory.
pub const CONFIG_FILE: &str = "config.toml";
pub const EQUIPMENT_FILE: &str = "equipment.toml";
pub const IO_FILE: &str = "io.toml";

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

// ─── Shared ─────────────────────────────────────────────────────────

/// Log level for application logging. Lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "barn-north"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Control ────────────────────────────────────────────────────────

fn default_io_timeout_ms() -> u64 {
    DEFAULT_IO_TIMEOUT_MS
}

fn default_interlock_timeout_ms() -> u64 {
    DEFAULT_INTERLOCK_TIMEOUT_MS
}

fn default_restart_delay_ms() -> u64 {
    DEFAULT_RESTART_DELAY_MS
}

fn default_mailbox_capacity() -> usize {
    DEFAULT_MAILBOX_CAPACITY
}

fn default_status_report_interval_s() -> u64 {
    DEFAULT_STATUS_REPORT_INTERVAL_S
}

/// Runtime tuning of the control engine.
///
/// # TOML Example
///
/// ```toml
/// [control]
/// io_timeout_ms = 300
/// interlock_timeout_ms = 300
/// restart_delay_ms = 1000
/// max_restarts = 0
/// mailbox_capacity = 32
/// status_report_interval_s = 60
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlConfig {
    /// Bound on every field bus read/write.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,

    /// Bound on every interlock query.
    #[serde(default = "default_interlock_timeout_ms")]
    pub interlock_timeout_ms: u64,

    /// Wait before restarting a crashed actor.
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,

    /// Restarts allowed per equipment; 0 = unlimited.
    #[serde(default)]
    pub max_restarts: u32,

    /// Command mailbox depth per actor.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Period of the status report; 0 disables it.
    #[serde(default = "default_status_report_interval_s")]
    pub status_report_interval_s: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
            interlock_timeout_ms: DEFAULT_INTERLOCK_TIMEOUT_MS,
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            max_restarts: 0,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            status_report_interval_s: DEFAULT_STATUS_REPORT_INTERVAL_S,
        }
    }
}

impl ControlConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn interlock_timeout(&self) -> Duration {
        Duration::from_millis(self.interlock_timeout_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// `None` when the report is disabled.
    pub fn status_report_interval(&self) -> Option<Duration> {
        (self.status_report_interval_s > 0)
            .then(|| Duration::from_secs(self.status_report_interval_s))
    }

    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if a timeout or the mailbox
    /// capacity is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.io_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "control.io_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.interlock_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "control.interlock_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "control.mailbox_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Interlocks ─────────────────────────────────────────────────────

/// Cross-equipment start precondition.
///
/// ```toml
/// [[interlock]]
/// equipment = "conveyor_1"
/// requires_running = ["fan_1"]
/// requires_stopped = ["feeder_1"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterlockRule {
    /// Equipment gated by this rule.
    pub equipment: String,
    /// Equipment that must be running.
    #[serde(default)]
    pub requires_running: Vec<String>,
    /// Equipment that must be stopped.
    #[serde(default)]
    pub requires_stopped: Vec<String>,
}

impl InterlockRule {
    /// Every equipment name this rule refers to.
    pub fn referenced(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.equipment.as_str())
            .chain(self.requires_running.iter().map(String::as_str))
            .chain(self.requires_stopped.iter().map(String::as_str))
    }
}

// ─── Files ──────────────────────────────────────────────────────────

/// Root of `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default, rename = "interlock")]
    pub interlocks: Vec<InterlockRule>,
}

/// Root of `equipment.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquipmentFile {
    #[serde(default)]
    pub equipment: Vec<EquipmentConfig>,
}

/// Everything loaded from a configuration directory.
#[derive(Debug, Clone)]
pub struct FullConfig {
    pub shared: SharedConfig,
    pub control: ControlConfig,
    pub interlocks: Vec<InterlockRule>,
    pub equipment: Vec<EquipmentConfig>,
    /// Simulated point table, when `io.toml` exists.
    pub io: Option<SimBusConfig>,
}

impl FullConfig {
    /// Validate every section and cross-references.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - any section fails its own validation
    /// - two equipment records share a name
    /// - an interlock rule references unknown equipment
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.control.validate()?;

        let mut names = HashSet::new();
        for equipment in &self.equipment {
            equipment.validate()?;
            if !names.insert(equipment.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate equipment name '{}'",
                    equipment.name
                )));
            }
        }

        for rule in &self.interlocks {
            if let Some(unknown) = rule.referenced().find(|n| !names.contains(n)) {
                return Err(ConfigError::ValidationError(format!(
                    "interlock for '{}' references unknown equipment '{}'",
                    rule.equipment, unknown
                )));
            }
        }

        if let Some(io) = &self.io {
            io.validate()?;
        }
        Ok(())
    }

    /// Equipment record by name.
    pub fn equipment(&self, name: &str) -> Option<&EquipmentConfig> {
        self.equipment.iter().find(|e| e.name == name)
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `serde::de::DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if the file cannot be read or parsed
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Load and validate a whole configuration directory.
///
/// `config.toml` and `equipment.toml` are required; `io.toml` is optional.
pub fn load_config_dir(dir: &Path) -> Result<FullConfig, ConfigError> {
    let app = AppConfig::load(&dir.join(CONFIG_FILE))?;
    let equipment = EquipmentFile::load(&dir.join(EQUIPMENT_FILE))?;

    let io_path = dir.join(IO_FILE);
    let io = match SimBusConfig::load(&io_path) {
        Ok(io) => Some(io),
        Err(ConfigError::FileNotFound) => {
            debug!("No {} in {}", IO_FILE, dir.display());
            None
        }
        Err(e) => return Err(e),
    };

    let config = FullConfig {
        shared: app.shared,
        control: app.control,
        interlocks: app.interlocks,
        equipment: equipment.equipment,
        io,
    };
    config.validate()?;

    info!(
        "Loaded configuration from {}: {} equipment, {} interlock rules",
        dir.display(),
        config.equipment.len(),
        config.interlocks.len()
    );
    Ok(config)
}
