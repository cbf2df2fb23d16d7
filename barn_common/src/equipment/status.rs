//! Status payload read by UI, automation and report consumers.
//!
//! A flat record: identity, booleans, mode, error plus message, and
//! feature-conditional fields that only appear when the configuration
//! enables them.
//!
//! # JSON Example
//!
//! ```json
//! {
//!   "name": "fan_1", "title": "Exhaust fan 1", "kind": "binary",
//!   "mode": "auto", "is_running": true, "is_tripped": false,
//!   "error": null, "error_message": null, "interlocked": false,
//!   "inverted": false, "commanded_on": true, "actual_on": true
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::config::{EquipmentConfig, EquipmentKind};
use super::error::ErrorKind;
use super::state::{BinaryState, Mode, MoveTarget, PositionalState};

/// Variant-specific part of the status payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusDetail {
    Binary {
        commanded_on: bool,
        actual_on: bool,
    },
    Positional {
        commanded_target: Option<MoveTarget>,
        at_front_limit: bool,
        at_back_limit: bool,
        front_coil_on: bool,
        back_coil_on: bool,
        is_moving: bool,
    },
}

/// Snapshot of one equipment, as published by its actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentStatus {
    pub name: String,
    pub title: String,
    pub kind: EquipmentKind,
    pub mode: Mode,
    pub is_running: bool,
    pub is_tripped: bool,
    pub error: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub interlocked: bool,

    /// Present only when a mode point is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_manual_virtual: Option<bool>,

    /// Present only on binary equipment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverted: Option<bool>,

    #[serde(flatten)]
    pub detail: StatusDetail,
}

impl EquipmentStatus {
    pub fn from_binary(config: &EquipmentConfig, state: &BinaryState) -> Self {
        Self {
            name: config.name.clone(),
            title: config.display_title().to_string(),
            kind: EquipmentKind::Binary,
            mode: state.mode,
            is_running: state.is_running,
            is_tripped: state.is_tripped,
            error: state.error,
            error_message: state.error.map(|e| e.message().to_string()),
            interlocked: state.interlocked,
            is_auto_manual_virtual: config
                .auto_manual_enabled()
                .then_some(state.is_auto_manual_virtual),
            inverted: Some(config.inverted),
            detail: StatusDetail::Binary {
                commanded_on: state.commanded_on,
                actual_on: state.actual_on,
            },
        }
    }

    pub fn from_positional(config: &EquipmentConfig, state: &PositionalState) -> Self {
        Self {
            name: config.name.clone(),
            title: config.display_title().to_string(),
            kind: EquipmentKind::Positional,
            mode: state.mode,
            is_running: state.is_moving,
            is_tripped: state.is_tripped,
            error: state.error,
            error_message: state.error.map(|e| e.message().to_string()),
            interlocked: state.interlocked,
            is_auto_manual_virtual: config
                .auto_manual_enabled()
                .then_some(state.is_auto_manual_virtual),
            inverted: None,
            detail: StatusDetail::Positional {
                commanded_target: state.commanded_target,
                at_front_limit: state.at_front_limit,
                at_back_limit: state.at_back_limit,
                front_coil_on: state.front_coil_on,
                back_coil_on: state.back_coil_on,
                is_moving: state.is_moving,
            },
        }
    }

    /// Minimal snapshot for an equipment whose actor state is unavailable.
    pub fn placeholder(config: &EquipmentConfig) -> Self {
        match config.kind {
            EquipmentKind::Binary => Self::from_binary(config, &BinaryState::crashed(config)),
            EquipmentKind::Positional => {
                Self::from_positional(config, &PositionalState::crashed(config))
            }
        }
    }

    /// Commanded-on flag of binary equipment, target presence of positional.
    pub fn is_commanded(&self) -> bool {
        match &self.detail {
            StatusDetail::Binary { commanded_on, .. } => *commanded_on,
            StatusDetail::Positional {
                commanded_target, ..
            } => commanded_target.is_some(),
        }
    }
}
