//! Mutable equipment state.
//!
//! Each state struct is owned exclusively by its controller actor. Observed
//! fields (`actual_on`, `at_front_limit`, ...) only ever come from the most
//! recent successful hardware read; intent lives in `commanded_*`.

use core::fmt;
use serde::{Deserialize, Serialize};

use super::config::EquipmentConfig;
use super::error::ErrorKind;

// ─── Mode ───────────────────────────────────────────────────────────

/// Control authority of an equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Software (automation, operator UI) controls the coil.
    #[default]
    Auto,
    /// The panel switch controls the coil.
    Manual,
}

impl Mode {
    /// Decode a mode bit: `1` = auto, `0` = manual.
    #[inline]
    pub const fn from_bit(bit: bool) -> Self {
        if bit { Self::Auto } else { Self::Manual }
    }

    /// Encode as a mode bit.
    #[inline]
    pub const fn as_bit(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Mode an equipment falls back to when nothing can be read.
    pub const fn fallback(always_manual: bool) -> Self {
        if always_manual { Self::Manual } else { Self::Auto }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── MoveTarget ─────────────────────────────────────────────────────

/// Travel direction of positional equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveTarget {
    Front,
    Back,
}

impl MoveTarget {
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

impl fmt::Display for MoveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── BinaryState ────────────────────────────────────────────────────

/// State of single-coil on/off equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryState {
    pub commanded_on: bool,
    pub actual_on: bool,
    pub is_running: bool,
    pub is_tripped: bool,
    pub mode: Mode,
    pub is_auto_manual_virtual: bool,
    pub error: Option<ErrorKind>,
    pub error_count: u32,
    pub interlocked: bool,
}

impl BinaryState {
    /// State before the first poll.
    pub fn initial(config: &EquipmentConfig) -> Self {
        Self {
            commanded_on: false,
            actual_on: false,
            is_running: false,
            is_tripped: false,
            mode: Mode::fallback(config.always_manual),
            is_auto_manual_virtual: config.mode_is_virtual(),
            error: None,
            error_count: 0,
            interlocked: false,
        }
    }

    /// State of a restarted actor: everything unknown, tagged as crashed.
    pub fn crashed(config: &EquipmentConfig) -> Self {
        Self {
            error: Some(ErrorKind::CrashedPreviously),
            ..Self::initial(config)
        }
    }

    /// Manual mode owned by a physical switch: software must not drive the coil.
    #[inline]
    pub fn is_physical_manual(&self) -> bool {
        self.mode == Mode::Manual && !self.is_auto_manual_virtual
    }

    /// Short state label used in stop events.
    pub fn label(&self) -> &'static str {
        match (self.actual_on, self.is_running) {
            (true, true) => "running",
            (true, false) => "energized",
            (false, true) => "coasting",
            (false, false) => "stopped",
        }
    }
}

// ─── PositionalState ────────────────────────────────────────────────

/// State of dual-coil, limit-bounded travelling equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalState {
    pub commanded_target: Option<MoveTarget>,
    pub at_front_limit: bool,
    pub at_back_limit: bool,
    pub front_coil_on: bool,
    pub back_coil_on: bool,
    pub is_moving: bool,
    pub is_tripped: bool,
    pub mode: Mode,
    pub is_auto_manual_virtual: bool,
    pub error: Option<ErrorKind>,
    pub error_count: u32,
    pub interlocked: bool,
}

impl PositionalState {
    pub fn initial(config: &EquipmentConfig) -> Self {
        Self {
            commanded_target: None,
            at_front_limit: false,
            at_back_limit: false,
            front_coil_on: false,
            back_coil_on: false,
            is_moving: false,
            is_tripped: false,
            mode: Mode::fallback(config.always_manual),
            is_auto_manual_virtual: config.mode_is_virtual(),
            error: None,
            error_count: 0,
            interlocked: false,
        }
    }

    pub fn crashed(config: &EquipmentConfig) -> Self {
        Self {
            error: Some(ErrorKind::CrashedPreviously),
            ..Self::initial(config)
        }
    }

    #[inline]
    pub fn is_physical_manual(&self) -> bool {
        self.mode == Mode::Manual && !self.is_auto_manual_virtual
    }

    /// Limit switch in `target`'s direction.
    pub fn at_limit(&self, target: MoveTarget) -> bool {
        match target {
            MoveTarget::Front => self.at_front_limit,
            MoveTarget::Back => self.at_back_limit,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.commanded_target {
            Some(MoveTarget::Front) => "moving_front",
            Some(MoveTarget::Back) => "moving_back",
            None if self.at_front_limit => "at_front",
            None if self.at_back_limit => "at_back",
            None => "idle",
        }
    }
}
