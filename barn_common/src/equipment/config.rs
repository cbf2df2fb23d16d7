//! Equipment configuration records.
//!
//! One [`EquipmentConfig`] per physical installation, deserialized from the
//! `[[equipment]]` array of `equipment.toml`. Immutable once an actor starts.
//!
//! # TOML Example
//!
//! ```toml
//! [[equipment]]
//! name = "fan_1"
//! title = "Exhaust fan 1"
//! kind = "binary"
//! inverted = false
//! poll_interval_ms = 1000
//! error_debounce_threshold = 3
//!
//! [equipment.points]
//! on_off_coil = "DO_FAN1"
//! running_feedback = "DI_FAN1_RUN"
//! auto_manual = "DI_FAN1_AUTO"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ConfigError;
use crate::consts::{DEFAULT_ERROR_DEBOUNCE_THRESHOLD, DEFAULT_POLL_INTERVAL_MS};
use crate::io::role::PointRole;

// ─── EquipmentKind ──────────────────────────────────────────────────

/// Actuator geometry of an equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentKind {
    /// Single coil on/off device (fan, pump, light, conveyor, siren).
    #[default]
    Binary,
    /// Dual coil, limit-switch bounded travelling device (feeder).
    Positional,
}

// ─── PointMap ───────────────────────────────────────────────────────

/// Role → point-name table of one equipment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_off_coil: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_manual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_front_coil: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_back_coil: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_sensor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_feedback: Option<String>,
}

impl PointMap {
    /// Point name bound to `role`, if any.
    pub fn get(&self, role: PointRole) -> Option<&str> {
        let slot = match role {
            PointRole::OnOffCoil => &self.on_off_coil,
            PointRole::RunningFeedback => &self.running_feedback,
            PointRole::AutoManual => &self.auto_manual,
            PointRole::Trip => &self.trip,
            PointRole::ToFrontCoil => &self.to_front_coil,
            PointRole::ToBackCoil => &self.to_back_coil,
            PointRole::FrontLimit => &self.front_limit,
            PointRole::BackLimit => &self.back_limit,
            PointRole::MotionSensor => &self.motion_sensor,
            PointRole::ForwardFeedback => &self.forward_feedback,
            PointRole::ReverseFeedback => &self.reverse_feedback,
        };
        slot.as_deref()
    }

    /// Bind `role` to `point`, replacing any previous binding.
    pub fn set(&mut self, role: PointRole, point: impl Into<String>) {
        let point = Some(point.into());
        match role {
            PointRole::OnOffCoil => self.on_off_coil = point,
            PointRole::RunningFeedback => self.running_feedback = point,
            PointRole::AutoManual => self.auto_manual = point,
            PointRole::Trip => self.trip = point,
            PointRole::ToFrontCoil => self.to_front_coil = point,
            PointRole::ToBackCoil => self.to_back_coil = point,
            PointRole::FrontLimit => self.front_limit = point,
            PointRole::BackLimit => self.back_limit = point,
            PointRole::MotionSensor => self.motion_sensor = point,
            PointRole::ForwardFeedback => self.forward_feedback = point,
            PointRole::ReverseFeedback => self.reverse_feedback = point,
        }
    }

    /// Iterate over bound `(role, point)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (PointRole, &str)> + '_ {
        PointRole::ALL
            .into_iter()
            .filter_map(move |role| self.get(role).map(|point| (role, point)))
    }
}

// ─── EquipmentConfig ────────────────────────────────────────────────

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_error_debounce_threshold() -> u32 {
    DEFAULT_ERROR_DEBOUNCE_THRESHOLD
}

/// Static description of one equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquipmentConfig {
    /// Unique equipment name (directory key).
    pub name: String,

    /// Human-readable title.
    #[serde(default)]
    pub title: String,

    /// Actuator geometry.
    #[serde(default)]
    pub kind: EquipmentKind,

    /// Role → point-name bindings.
    #[serde(default)]
    pub points: PointMap,

    /// NC relay wiring: the equipment runs while its coil is de-energized.
    #[serde(default)]
    pub inverted: bool,

    /// Poll period in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive mismatch polls before a mismatch fault is surfaced.
    #[serde(default = "default_error_debounce_threshold")]
    pub error_debounce_threshold: u32,

    /// The equipment can only be run from its panel.
    #[serde(default)]
    pub always_manual: bool,

    /// The mode point is software-backed and owned by this controller.
    #[serde(default)]
    pub auto_manual_virtual: bool,

    /// Feature override; defaults to "running_feedback point present".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_running_feedback: Option<bool>,

    /// Feature override; defaults to "auto_manual point present".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_auto_manual: Option<bool>,

    /// Feature override; defaults to "trip point present".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_trip_signal: Option<bool>,
}

impl EquipmentConfig {
    /// Minimal binary equipment with only an on/off coil.
    pub fn binary(name: impl Into<String>, coil: impl Into<String>) -> Self {
        let mut points = PointMap::default();
        points.set(PointRole::OnOffCoil, coil);
        Self::with_points(name, EquipmentKind::Binary, points)
    }

    /// Minimal positional equipment with both coils and both limits.
    pub fn positional(
        name: impl Into<String>,
        to_front_coil: impl Into<String>,
        to_back_coil: impl Into<String>,
        front_limit: impl Into<String>,
        back_limit: impl Into<String>,
    ) -> Self {
        let mut points = PointMap::default();
        points.set(PointRole::ToFrontCoil, to_front_coil);
        points.set(PointRole::ToBackCoil, to_back_coil);
        points.set(PointRole::FrontLimit, front_limit);
        points.set(PointRole::BackLimit, back_limit);
        Self::with_points(name, EquipmentKind::Positional, points)
    }

    fn with_points(name: impl Into<String>, kind: EquipmentKind, points: PointMap) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            kind,
            points,
            inverted: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            error_debounce_threshold: DEFAULT_ERROR_DEBOUNCE_THRESHOLD,
            always_manual: false,
            auto_manual_virtual: false,
            has_running_feedback: None,
            has_auto_manual: None,
            has_trip_signal: None,
        }
    }

    /// Builder: bind an extra point.
    pub fn with_point(mut self, role: PointRole, point: impl Into<String>) -> Self {
        self.points.set(role, point);
        self
    }

    /// Poll period as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Display title, falling back to the name.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }

    // ─── Resolved feature flags ─────────────────────────────────────

    /// Running feedback is wired and enabled.
    pub fn running_feedback_enabled(&self) -> bool {
        self.has_running_feedback
            .unwrap_or(self.points.running_feedback.is_some())
            && self.points.running_feedback.is_some()
    }

    /// A mode switch point is wired and enabled.
    pub fn auto_manual_enabled(&self) -> bool {
        self.has_auto_manual
            .unwrap_or(self.points.auto_manual.is_some())
            && self.points.auto_manual.is_some()
    }

    /// A trip signal is wired and enabled.
    pub fn trip_signal_enabled(&self) -> bool {
        self.has_trip_signal.unwrap_or(self.points.trip.is_some()) && self.points.trip.is_some()
    }

    /// The mode switch is owned by software.
    pub fn mode_is_virtual(&self) -> bool {
        self.auto_manual_virtual && self.auto_manual_enabled() && !self.always_manual
    }

    /// Roles that must be bound for this kind.
    pub fn required_roles(&self) -> &'static [PointRole] {
        match self.kind {
            EquipmentKind::Binary => &[PointRole::OnOffCoil],
            EquipmentKind::Positional => &[
                PointRole::ToFrontCoil,
                PointRole::ToBackCoil,
                PointRole::FrontLimit,
                PointRole::BackLimit,
            ],
        }
    }

    /// Validate the record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `name` is empty
    /// - `poll_interval_ms` is zero or `error_debounce_threshold` is zero
    /// - a role required by the kind is unbound
    /// - a role belongs to the other kind
    /// - a feature flag is forced on without its point
    /// - `auto_manual_virtual` is set without an `auto_manual` point
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.name.trim().is_empty() {
            return fail("equipment name cannot be empty".to_string());
        }
        if self.poll_interval_ms == 0 {
            return fail(format!("{}: poll_interval_ms must be > 0", self.name));
        }
        if self.error_debounce_threshold == 0 {
            return fail(format!("{}: error_debounce_threshold must be >= 1", self.name));
        }

        for role in self.required_roles() {
            if self.points.get(*role).is_none() {
                return fail(format!("{}: missing required point '{}'", self.name, role));
            }
        }

        for (role, point) in self.points.iter() {
            if point.trim().is_empty() {
                return fail(format!("{}: point '{}' has an empty name", self.name, role));
            }
            let foreign = match self.kind {
                EquipmentKind::Binary => role.is_positional_only(),
                EquipmentKind::Positional => role.is_binary_only(),
            };
            if foreign {
                return fail(format!(
                    "{}: point '{}' is not valid for {:?} equipment",
                    self.name, role, self.kind
                ));
            }
        }

        let forced = [
            (self.has_running_feedback, PointRole::RunningFeedback),
            (self.has_auto_manual, PointRole::AutoManual),
            (self.has_trip_signal, PointRole::Trip),
        ];
        for (flag, role) in forced {
            if flag == Some(true) && self.points.get(role).is_none() {
                return fail(format!(
                    "{}: feature for '{}' enabled but no point bound",
                    self.name, role
                ));
            }
        }
        if self.kind == EquipmentKind::Positional && self.has_running_feedback == Some(true) {
            return fail(format!(
                "{}: positional equipment uses forward/reverse feedback",
                self.name
            ));
        }

        if self.auto_manual_virtual && self.points.auto_manual.is_none() {
            return fail(format!(
                "{}: auto_manual_virtual requires an auto_manual point",
                self.name
            ));
        }

        Ok(())
    }
}
