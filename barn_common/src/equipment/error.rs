//! Equipment fault taxonomy.
//!
//! At most one [`ErrorKind`] is active on an equipment at any instant. The
//! enum is colocated with its display text and classification so no
//! per-equipment lookup tables exist.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Fault class of an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// Hardware unreachable or malformed.
    Communication,
    /// Write attempted and rejected.
    Actuation,
    /// Motor protection engaged.
    Protection,
    /// Commanded and observed state disagree beyond tolerance.
    Mismatch,
    /// Internal invariant violation.
    Defensive,
}

/// Equipment fault attached to the equipment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Timeout,
    InvalidData,
    CommandFailed,
    Tripped,
    OnButNotRunning,
    OffButRunning,
    MovingWithoutTarget,
    ContactorFailure,
    MechanicalStall,
    CrashedPreviously,
}

impl ErrorKind {
    /// Fixed operator-facing message.
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Timeout => "Communication timeout",
            Self::InvalidData => "Invalid data from device",
            Self::CommandFailed => "Command failed",
            Self::Tripped => "Motor protection tripped",
            Self::OnButNotRunning => "Commanded on but not running",
            Self::OffButRunning => "Commanded off but running",
            Self::MovingWithoutTarget => "Moving without a commanded target",
            Self::ContactorFailure => "Contactor did not engage",
            Self::MechanicalStall => "Mechanical stall, no motion detected",
            Self::CrashedPreviously => "Controller restarted after a crash",
        }
    }

    /// Taxonomy class.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout | Self::InvalidData => ErrorClass::Communication,
            Self::CommandFailed => ErrorClass::Actuation,
            Self::Tripped => ErrorClass::Protection,
            Self::OnButNotRunning
            | Self::OffButRunning
            | Self::MovingWithoutTarget
            | Self::ContactorFailure
            | Self::MechanicalStall => ErrorClass::Mismatch,
            Self::CrashedPreviously => ErrorClass::Defensive,
        }
    }

    /// Mismatch faults need consecutive confirmation; everything else is
    /// surfaced on first sight.
    #[inline]
    pub const fn is_debounced(&self) -> bool {
        matches!(self.class(), ErrorClass::Mismatch)
    }

    /// Wire name (camelCase), as used in status payloads and events.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::InvalidData => "invalidData",
            Self::CommandFailed => "commandFailed",
            Self::Tripped => "tripped",
            Self::OnButNotRunning => "onButNotRunning",
            Self::OffButRunning => "offButRunning",
            Self::MovingWithoutTarget => "movingWithoutTarget",
            Self::ContactorFailure => "contactorFailure",
            Self::MechanicalStall => "mechanicalStall",
            Self::CrashedPreviously => "crashedPreviously",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
