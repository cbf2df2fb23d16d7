//! Structured equipment events for the event logger.

use serde::Serialize;
use std::collections::BTreeMap;

use super::error::ErrorKind;
use super::state::Mode;

/// Free-form event context (e.g. `direction = "front"`).
pub type Metadata = BTreeMap<String, String>;

/// Origin of a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggeredBy {
    /// A command received through the directory.
    Operator,
    /// The physical panel switch.
    Panel,
    /// The control loop itself.
    Controller,
}

/// One equipment event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EquipmentEvent {
    Started {
        name: String,
        mode: Mode,
        triggered_by: TriggeredBy,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        metadata: Metadata,
    },
    Stopped {
        name: String,
        mode: Mode,
        triggered_by: TriggeredBy,
        from_state: String,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        metadata: Metadata,
    },
    /// Surfaced error changed. `to == None` is a recovery.
    ErrorChanged {
        name: String,
        mode: Mode,
        from: Option<ErrorKind>,
        to: Option<ErrorKind>,
    },
    ModeChanged {
        name: String,
        from: Mode,
        to: Mode,
        triggered_by: TriggeredBy,
    },
    InterlockBlocked {
        name: String,
        mode: Mode,
    },
}

impl EquipmentEvent {
    pub fn name(&self) -> &str {
        match self {
            Self::Started { name, .. }
            | Self::Stopped { name, .. }
            | Self::ErrorChanged { name, .. }
            | Self::ModeChanged { name, .. }
            | Self::InterlockBlocked { name, .. } => name,
        }
    }

    /// Mode in effect when the event was raised.
    pub fn mode(&self) -> Mode {
        match self {
            Self::Started { mode, .. }
            | Self::Stopped { mode, .. }
            | Self::ErrorChanged { mode, .. }
            | Self::InterlockBlocked { mode, .. } => *mode,
            Self::ModeChanged { to, .. } => *to,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Stopped { .. } => "stopped",
            Self::ErrorChanged { .. } => "error_changed",
            Self::ModeChanged { .. } => "mode_changed",
            Self::InterlockBlocked { .. } => "interlock_blocked",
        }
    }

    /// True for an `ErrorChanged` that clears the error.
    pub fn is_recovery(&self) -> bool {
        matches!(self, Self::ErrorChanged { from: Some(_), to: None, .. })
    }
}
