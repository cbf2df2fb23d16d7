//! Simulated field bus configuration (`io.toml`).
//!
//! ```toml
//! [[point]]
//! name = "DO_FAN1"
//!
//! [[point.linked]]
//! trigger = true
//! delay_s = 0.5
//! point = "DI_FAN1_RUN"
//! result = true
//!
//! [[point]]
//! name = "DI_FAN1_RUN"
//!
//! [[point]]
//! name = "DI_FAN1_AUTO"
//! initial = 1
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::ConfigError;

/// Delayed reaction of one point to an edge on another.
///
/// When the owning point changes to `trigger`, `point` is set to `result`
/// after `delay_s` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkedPoint {
    pub trigger: bool,
    #[serde(default)]
    pub delay_s: f64,
    pub point: String,
    pub result: bool,
}

/// One simulated point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimPointConfig {
    pub name: String,
    #[serde(default)]
    pub initial: i64,
    #[serde(default)]
    pub linked: Vec<LinkedPoint>,
}

/// Root of `io.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimBusConfig {
    #[serde(default)]
    pub point: Vec<SimPointConfig>,
}

impl SimBusConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if point names are empty or
    /// duplicated, a reaction targets an unknown point, or a delay is
    /// negative or not finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for point in &self.point {
            if point.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "io point name cannot be empty".to_string(),
                ));
            }
            if !names.insert(point.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate io point '{}'",
                    point.name
                )));
            }
        }

        for point in &self.point {
            for link in &point.linked {
                if !names.contains(link.point.as_str()) {
                    return Err(ConfigError::ValidationError(format!(
                        "io point '{}' links to unknown point '{}'",
                        point.name, link.point
                    )));
                }
                if !link.delay_s.is_finite() || link.delay_s < 0.0 {
                    return Err(ConfigError::ValidationError(format!(
                        "io point '{}': invalid delay {}",
                        point.name, link.delay_s
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.point.iter().any(|p| p.name == name)
    }
}
