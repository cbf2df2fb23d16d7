//! Interlock adapters.
//!
//! Controllers consult interlocks only through [`InterlockGate`], which
//! bounds the query and turns any failure into "allowed". A safety
//! subsystem outage must never deadlock normal operation.

use barn_common::config::InterlockRule;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::directory::Directory;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterlockError {
    /// The interlock service could not answer.
    #[error("interlock service unavailable: {0}")]
    Unavailable(String),

    /// A rule references equipment that is not registered.
    #[error("interlock references unknown equipment '{0}'")]
    UnknownEquipment(String),

    /// A rule references equipment whose actor is not running.
    #[error("status of '{0}' is unavailable")]
    StatusUnavailable(String),
}

/// Cross-equipment start precondition service.
pub trait InterlockClient: Send + Sync + 'static {
    /// May `name` be started right now?
    fn can_start(&self, name: &str) -> impl Future<Output = Result<bool, InterlockError>> + Send;
}

// ─── InterlockGate ──────────────────────────────────────────────────

/// Fail-open, time-bounded view of an [`InterlockClient`].
pub struct InterlockGate<I> {
    client: Arc<I>,
    timeout: Duration,
}

impl<I> Clone for InterlockGate<I> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            timeout: self.timeout,
        }
    }
}

impl<I: InterlockClient> InterlockGate<I> {
    pub fn new(client: Arc<I>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// `true` unless the client positively answers "not allowed".
    pub async fn allows(&self, name: &str) -> bool {
        match timeout(self.timeout, self.client.can_start(name)).await {
            Ok(Ok(allowed)) => allowed,
            Ok(Err(e)) => {
                warn!(equipment = %name, "Interlock check failed, allowing start: {}", e);
                true
            }
            Err(_) => {
                warn!(
                    equipment = %name,
                    "Interlock check timed out after {:?}, allowing start",
                    self.timeout
                );
                true
            }
        }
    }
}

// ─── NoInterlocks ───────────────────────────────────────────────────

/// Every start is allowed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterlocks;

impl InterlockClient for NoInterlocks {
    async fn can_start(&self, _name: &str) -> Result<bool, InterlockError> {
        Ok(true)
    }
}

// ─── RuleInterlocks ─────────────────────────────────────────────────

/// Evaluates `[[interlock]]` rules against live equipment status.
pub struct RuleInterlocks {
    rules: HashMap<String, Vec<InterlockRule>>,
    directory: Directory,
}

impl RuleInterlocks {
    pub fn new(rules: &[InterlockRule], directory: Directory) -> Self {
        let mut by_equipment: HashMap<String, Vec<InterlockRule>> = HashMap::new();
        for rule in rules {
            by_equipment
                .entry(rule.equipment.clone())
                .or_default()
                .push(rule.clone());
        }
        Self {
            rules: by_equipment,
            directory,
        }
    }

    fn is_running(&self, name: &str) -> Result<bool, InterlockError> {
        let handle = self
            .directory
            .lookup(name)
            .map_err(|_| InterlockError::UnknownEquipment(name.to_string()))?;
        if !handle.is_alive() {
            return Err(InterlockError::StatusUnavailable(name.to_string()));
        }
        Ok(handle.status().is_running)
    }

    /// Evaluate all rules for `name` synchronously.
    pub fn evaluate(&self, name: &str) -> Result<bool, InterlockError> {
        let Some(rules) = self.rules.get(name) else {
            return Ok(true);
        };
        for rule in rules {
            for other in &rule.requires_running {
                if !self.is_running(other)? {
                    debug!(equipment = %name, "Blocked: '{}' must be running", other);
                    return Ok(false);
                }
            }
            for other in &rule.requires_stopped {
                if self.is_running(other)? {
                    debug!(equipment = %name, "Blocked: '{}' must be stopped", other);
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

impl InterlockClient for RuleInterlocks {
    async fn can_start(&self, name: &str) -> Result<bool, InterlockError> {
        self.evaluate(name)
    }
}
