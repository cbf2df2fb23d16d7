//! Point role types.
//!
//! `PointRole` names the function a field point plays for one piece of
//! equipment (`"on_off_coil"`, `"front_limit"`, ...). Controllers resolve
//! points by role rather than by bus address.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

// ─── PointDirection ─────────────────────────────────────────────────

/// Whether the control loop reads or writes a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PointDirection {
    /// Hardware signal read by the control loop.
    Input = 0,
    /// Coil energized by the control loop.
    Output = 1,
}

impl fmt::Display for PointDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

// ─── PointRole ──────────────────────────────────────────────────────

/// Functional role of a field point within one equipment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointRole {
    // ── Binary equipment ────────────
    OnOffCoil,
    RunningFeedback,

    // ── Shared ──────────────────────
    AutoManual,
    Trip,

    // ── Positional equipment ────────
    ToFrontCoil,
    ToBackCoil,
    FrontLimit,
    BackLimit,
    MotionSensor,
    ForwardFeedback,
    ReverseFeedback,
}

impl PointRole {
    /// Every role, in configuration order.
    pub const ALL: [Self; 11] = [
        Self::OnOffCoil,
        Self::RunningFeedback,
        Self::AutoManual,
        Self::Trip,
        Self::ToFrontCoil,
        Self::ToBackCoil,
        Self::FrontLimit,
        Self::BackLimit,
        Self::MotionSensor,
        Self::ForwardFeedback,
        Self::ReverseFeedback,
    ];

    /// Configuration key of this role.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OnOffCoil => "on_off_coil",
            Self::RunningFeedback => "running_feedback",
            Self::AutoManual => "auto_manual",
            Self::Trip => "trip",
            Self::ToFrontCoil => "to_front_coil",
            Self::ToBackCoil => "to_back_coil",
            Self::FrontLimit => "front_limit",
            Self::BackLimit => "back_limit",
            Self::MotionSensor => "motion_sensor",
            Self::ForwardFeedback => "forward_feedback",
            Self::ReverseFeedback => "reverse_feedback",
        }
    }

    /// Direction the control loop drives this point.
    ///
    /// The mode point is read every poll but written when it is software-owned;
    /// it is classified by its primary use, as an input.
    pub const fn direction(&self) -> PointDirection {
        match self {
            Self::OnOffCoil | Self::ToFrontCoil | Self::ToBackCoil => PointDirection::Output,
            _ => PointDirection::Input,
        }
    }

    /// Roles that only make sense on positional (travelling) equipment.
    pub const fn is_positional_only(&self) -> bool {
        matches!(
            self,
            Self::ToFrontCoil
                | Self::ToBackCoil
                | Self::FrontLimit
                | Self::BackLimit
                | Self::MotionSensor
                | Self::ForwardFeedback
                | Self::ReverseFeedback
        )
    }

    /// Roles that only make sense on binary (on/off) equipment.
    pub const fn is_binary_only(&self) -> bool {
        matches!(self, Self::OnOffCoil | Self::RunningFeedback)
    }
}

impl fmt::Display for PointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown PointRole: {s:?}"))
    }
}
