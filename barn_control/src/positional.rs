//! Positional (dual coil, limit bounded) equipment controller.
//!
//! Travelling feeders: one coil drives towards the front limit, the other
//! towards the back limit. The commanded target is inferred from the coil
//! that hardware reports energized, so a restarted controller picks up a
//! travel already in progress.
//!
//! A travel ends when the limit in its direction triggers (auto-stop). For
//! [`MOVEMENT_GRACE_MS`] after every move, stop or auto-stop, mismatch
//! detection is suspended to absorb contactor and motor start-up lag.

use barn_common::consts::MOVEMENT_GRACE_MS;
use barn_common::equipment::config::EquipmentConfig;
use barn_common::equipment::error::ErrorKind;
use barn_common::equipment::event::{EquipmentEvent, Metadata, TriggeredBy};
use barn_common::equipment::state::{Mode, MoveTarget, PositionalState};
use barn_common::equipment::status::EquipmentStatus;
use barn_common::io::gateway::{FieldIo, IoError};
use barn_common::io::role::PointRole;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::actor::{Command, Origin, Ports, Reconciler};
use crate::debounce::debounce;
use crate::error::ControlError;
use crate::events::EventSink;
use crate::interlock::InterlockClient;

const MOVEMENT_GRACE: Duration = Duration::from_millis(MOVEMENT_GRACE_MS);

/// Motion evidence of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Motion {
    /// Best estimate of whether the drive is turning.
    pub moving: bool,
    /// Contactor feedback for the commanded direction, when wired.
    pub feedback: Option<bool>,
    /// Motion sensor verdict, when wired.
    pub sensor: Option<bool>,
}

/// Raw fault of one positional poll, in priority order.
pub fn classify(
    target: Option<MoveTarget>,
    is_tripped: bool,
    motion: Motion,
    check_mismatch: bool,
) -> Option<ErrorKind> {
    if is_tripped {
        return Some(ErrorKind::Tripped);
    }
    if !check_mismatch {
        return None;
    }
    match target {
        None if motion.moving => Some(ErrorKind::MovingWithoutTarget),
        None => None,
        Some(_) if motion.feedback == Some(false) => Some(ErrorKind::ContactorFailure),
        Some(_) if motion.sensor == Some(false) => Some(ErrorKind::MechanicalStall),
        Some(_) => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct Readings {
    front_coil: bool,
    back_coil: bool,
    front_limit: bool,
    back_limit: bool,
    pulse: Option<bool>,
    forward: Option<bool>,
    reverse: Option<bool>,
    trip: Option<bool>,
    mode: Option<bool>,
}

impl Readings {
    fn target(&self) -> Option<MoveTarget> {
        match (self.front_coil, self.back_coil) {
            (true, false) => Some(MoveTarget::Front),
            (false, true) => Some(MoveTarget::Back),
            _ => None,
        }
    }

    /// Motion evidence for `target`. A pulse sensor counts as moving when
    /// high or toggled; while idle only a toggle counts, since a resting
    /// sensor may sit high.
    fn motion(&self, target: Option<MoveTarget>, pulse_changed: bool) -> Motion {
        match target {
            Some(direction) => {
                let feedback = match direction {
                    MoveTarget::Front => self.forward,
                    MoveTarget::Back => self.reverse,
                };
                let sensor = self.pulse.map(|high| high || pulse_changed);
                Motion {
                    moving: sensor.or(feedback).unwrap_or(true),
                    feedback,
                    sensor,
                }
            }
            None => {
                let sensor = self.pulse.map(|_| pulse_changed);
                let engaged = self.forward.unwrap_or(false) || self.reverse.unwrap_or(false);
                Motion {
                    moving: sensor.unwrap_or(false) || engaged,
                    feedback: None,
                    sensor,
                }
            }
        }
    }
}

/// Required point names, resolved once.
#[derive(Debug, Clone)]
struct Coils {
    front: String,
    back: String,
    front_limit: String,
    back_limit: String,
}

impl Coils {
    fn resolve(config: &EquipmentConfig) -> Result<Self, ControlError> {
        let required = |role: PointRole| {
            config
                .points
                .get(role)
                .map(str::to_string)
                .ok_or_else(|| ControlError::MissingPoint {
                    equipment: config.name.clone(),
                    role,
                })
        };
        Ok(Self {
            front: required(PointRole::ToFrontCoil)?,
            back: required(PointRole::ToBackCoil)?,
            front_limit: required(PointRole::FrontLimit)?,
            back_limit: required(PointRole::BackLimit)?,
        })
    }

    /// `(energize, de-energize)` coils for a travel towards `target`.
    fn for_target(&self, target: MoveTarget) -> (&str, &str) {
        match target {
            MoveTarget::Front => (&self.front, &self.back),
            MoveTarget::Back => (&self.back, &self.front),
        }
    }
}

pub struct PositionalController<G, I, E> {
    config: EquipmentConfig,
    coils: Coils,
    ports: Ports<G, I, E>,
    state: PositionalState,
    inputs_ok: bool,
    last_mode: Option<Mode>,
    last_pulse: Option<bool>,
    /// Start of the current grace window.
    last_command_at: Option<Instant>,
}

impl<G: FieldIo, I: InterlockClient, E: EventSink> PositionalController<G, I, E> {
    pub fn new(config: EquipmentConfig, ports: Ports<G, I, E>) -> Result<Self, ControlError> {
        let state = PositionalState::initial(&config);
        Self::with_state(config, ports, state)
    }

    pub fn restarted(config: EquipmentConfig, ports: Ports<G, I, E>) -> Result<Self, ControlError> {
        let state = PositionalState::crashed(&config);
        Self::with_state(config, ports, state)
    }

    fn with_state(
        config: EquipmentConfig,
        ports: Ports<G, I, E>,
        state: PositionalState,
    ) -> Result<Self, ControlError> {
        let coils = Coils::resolve(&config)?;
        Ok(Self {
            config,
            coils,
            ports,
            state,
            inputs_ok: false,
            last_mode: None,
            last_pulse: None,
            last_command_at: None,
        })
    }

    pub fn state(&self) -> &PositionalState {
        &self.state
    }

    fn in_grace(&self, now: Instant) -> bool {
        self.last_command_at
            .is_some_and(|at| now.duration_since(at) < MOVEMENT_GRACE)
    }

    async fn read_inputs(&self) -> Result<Readings, ErrorKind> {
        let io = &self.ports.io;
        let points = &self.config.points;
        let mode_point = points
            .auto_manual
            .as_deref()
            .filter(|_| self.config.auto_manual_enabled());
        let trip_point = points
            .trip
            .as_deref()
            .filter(|_| self.config.trip_signal_enabled());

        Ok(Readings {
            front_coil: io.read_bit(&self.coils.front).await?,
            back_coil: io.read_bit(&self.coils.back).await?,
            front_limit: io.read_bit(&self.coils.front_limit).await?,
            back_limit: io.read_bit(&self.coils.back_limit).await?,
            pulse: io.read_opt(points.motion_sensor.as_deref()).await?,
            forward: io.read_opt(points.forward_feedback.as_deref()).await?,
            reverse: io.read_opt(points.reverse_feedback.as_deref()).await?,
            trip: io.read_opt(trip_point).await?,
            mode: io.read_opt(mode_point).await?,
        })
    }

    async fn write_both_off(&self) -> Result<(), IoError> {
        self.ports.io.write_bit(&self.coils.front, false).await?;
        self.ports.io.write_bit(&self.coils.back, false).await
    }

    /// De-energize both coils and open a grace window.
    ///
    /// On failure the observed coil state is kept as read.
    async fn halt(&mut self, now: Instant) -> Result<(), IoError> {
        self.write_both_off().await?;
        self.state.front_coil_on = false;
        self.state.back_coil_on = false;
        self.state.commanded_target = None;
        self.state.is_moving = false;
        self.last_command_at = Some(now);
        Ok(())
    }

    // ─── Poll path ──────────────────────────────────────────────────

    async fn refresh(&mut self) {
        let readings = match self.read_inputs().await {
            Ok(readings) => readings,
            Err(kind) => {
                self.enter_safe_state(kind).await;
                return;
            }
        };
        self.inputs_ok = true;
        let now = Instant::now();

        let pulse_changed = matches!(
            (self.last_pulse, readings.pulse),
            (Some(before), Some(after)) if before != after
        );
        self.last_pulse = readings.pulse;

        let state = &mut self.state;
        state.front_coil_on = readings.front_coil;
        state.back_coil_on = readings.back_coil;
        state.at_front_limit = readings.front_limit;
        state.at_back_limit = readings.back_limit;
        state.is_tripped = readings.trip.unwrap_or(false);
        state.mode = if self.config.always_manual {
            Mode::Manual
        } else {
            readings.mode.map(Mode::from_bit).unwrap_or(Mode::Auto)
        };

        let mut handover = false;
        if let Some(previous) = self.last_mode.replace(self.state.mode) {
            if previous != self.state.mode {
                handover = self.on_mode_observed(previous);
            }
        }
        let physical_manual = self.state.is_physical_manual();

        if readings.front_coil && readings.back_coil {
            warn!(equipment = %self.config.name, "Both coils energized");
            let mut fault = ErrorKind::InvalidData;
            if !physical_manual {
                if let Err(e) = self.halt(now).await {
                    warn!(equipment = %self.config.name, "Coil shutdown failed: {}", e);
                    fault = ErrorKind::CommandFailed;
                }
            }
            self.state.commanded_target = None;
            self.state.is_moving = false;
            self.last_command_at = Some(now);
            self.apply_error(Some(fault)).await;
            return;
        }

        let target = readings.target();
        let mut motion = readings.motion(target, pulse_changed);
        self.state.commanded_target = target;
        self.state.is_moving = motion.moving;

        let reason = match target {
            Some(_) if handover => Some("returned to auto"),
            Some(direction) if !physical_manual && self.state.at_limit(direction) => {
                Some("limit reached")
            }
            _ => None,
        };
        let mut stop_failed = false;
        if let (Some(reason), Some(direction)) = (reason, target) {
            let from_state = self.state.label();
            match self.halt(now).await {
                Ok(()) => {
                    info!(equipment = %self.config.name, "Travel stopped: {}", reason);
                    motion = Motion::default();
                    if self.state.mode == Mode::Manual {
                        let mut metadata = Metadata::new();
                        metadata.insert("direction".to_string(), direction.as_str().to_string());
                        self.ports.events.record(EquipmentEvent::Stopped {
                            name: self.config.name.clone(),
                            mode: self.state.mode,
                            triggered_by: TriggeredBy::Controller,
                            from_state: from_state.to_string(),
                            metadata,
                        });
                    }
                }
                Err(e) => {
                    warn!(equipment = %self.config.name, "Stop failed ({}): {}", reason, e);
                    stop_failed = true;
                }
            }
        }

        let raw = if stop_failed && !self.state.is_tripped {
            Some(ErrorKind::CommandFailed)
        } else {
            classify(
                self.state.commanded_target,
                self.state.is_tripped,
                motion,
                !physical_manual && !self.in_grace(now),
            )
        };
        self.apply_error(raw).await;
    }

    /// Returns `true` when a physical switch handed control back to software.
    fn on_mode_observed(&mut self, previous: Mode) -> bool {
        let current = self.state.mode;
        info!(equipment = %self.config.name, "Mode switched {} -> {}", previous, current);
        self.ports.events.record(EquipmentEvent::ModeChanged {
            name: self.config.name.clone(),
            from: previous,
            to: current,
            triggered_by: if self.state.is_auto_manual_virtual {
                TriggeredBy::Controller
            } else {
                TriggeredBy::Panel
            },
        });
        previous == Mode::Manual
            && current == Mode::Auto
            && !self.state.is_auto_manual_virtual
            && !self.config.always_manual
    }

    async fn enter_safe_state(&mut self, kind: ErrorKind) {
        self.inputs_ok = false;
        let state = &mut self.state;
        state.commanded_target = None;
        state.at_front_limit = false;
        state.at_back_limit = false;
        state.front_coil_on = false;
        state.back_coil_on = false;
        state.is_moving = false;
        state.is_tripped = false;
        state.mode = Mode::fallback(self.config.always_manual);
        self.apply_error(Some(kind)).await;
    }

    async fn apply_error(&mut self, raw: Option<ErrorKind>) {
        let verdict = debounce(
            raw,
            self.state.error,
            self.state.error_count,
            self.config.error_debounce_threshold,
        );
        self.state.error_count = verdict.count;
        if verdict.error == self.state.error {
            if self.state.interlocked {
                self.update_interlocked().await;
            }
            return;
        }

        let from = std::mem::replace(&mut self.state.error, verdict.error);
        match (from, verdict.error) {
            (_, Some(to)) => {
                warn!(equipment = %self.config.name, "Error {}: {}", to, to.message())
            }
            (Some(from), None) => info!(equipment = %self.config.name, "Recovered from {}", from),
            (None, None) => {}
        }
        self.ports.events.record(EquipmentEvent::ErrorChanged {
            name: self.config.name.clone(),
            mode: self.state.mode,
            from,
            to: verdict.error,
        });

        self.update_interlocked().await;
    }

    /// Advisory only: set while stopped, error-free and refused by the gate.
    async fn update_interlocked(&mut self) {
        self.state.interlocked = if self.state.error.is_none() && !self.state.is_moving {
            !self.ports.gate.allows(&self.config.name).await
        } else {
            false
        };
    }

    // ─── Command path ───────────────────────────────────────────────

    async fn move_to(&mut self, target: MoveTarget) {
        if self.state.is_physical_manual() {
            debug!(equipment = %self.config.name, "Move ignored: panel has control");
            return;
        }
        if !self.inputs_ok {
            warn!(equipment = %self.config.name, "Move to {} refused: inputs unavailable", target);
            return;
        }
        if self.state.at_limit(target) {
            debug!(equipment = %self.config.name, "Already at {} limit", target);
            return;
        }
        if self.state.commanded_target == Some(target) {
            return;
        }
        if !self.ports.gate.allows(&self.config.name).await {
            info!(equipment = %self.config.name, "Move blocked by interlock");
            self.state.interlocked = true;
            self.ports.events.record(EquipmentEvent::InterlockBlocked {
                name: self.config.name.clone(),
                mode: self.state.mode,
            });
            return;
        }

        let (energize, release) = self.coils.for_target(target);
        let written = async {
            self.ports.io.write_bit(release, false).await?;
            self.ports.io.write_bit(energize, true).await
        }
        .await;
        if let Err(e) = written {
            warn!(equipment = %self.config.name, "Move to {} failed: {}", target, e);
            self.apply_error(Some(ErrorKind::CommandFailed)).await;
            return;
        }

        info!(equipment = %self.config.name, "Moving to {}", target);
        self.state.commanded_target = Some(target);
        self.last_command_at = Some(Instant::now());
        self.state.interlocked = false;
        self.apply_error(None).await;

        if self.state.mode == Mode::Manual {
            let mut metadata = Metadata::new();
            metadata.insert("direction".to_string(), target.as_str().to_string());
            self.ports.events.record(EquipmentEvent::Started {
                name: self.config.name.clone(),
                mode: self.state.mode,
                triggered_by: Origin::Command.triggered_by(),
                metadata,
            });
        }
        self.refresh().await;
    }

    async fn stop_movement(&mut self) {
        if self.state.is_physical_manual() {
            debug!(equipment = %self.config.name, "Stop ignored: panel has control");
            return;
        }
        let from_state = self.state.label();
        if let Err(e) = self.halt(Instant::now()).await {
            warn!(equipment = %self.config.name, "Stop failed: {}", e);
            self.apply_error(Some(ErrorKind::CommandFailed)).await;
            return;
        }
        info!(equipment = %self.config.name, "Stopped from {}", from_state);

        if self.state.mode == Mode::Manual {
            self.ports.events.record(EquipmentEvent::Stopped {
                name: self.config.name.clone(),
                mode: self.state.mode,
                triggered_by: Origin::Command.triggered_by(),
                from_state: from_state.to_string(),
                metadata: Metadata::new(),
            });
        }
        self.refresh().await;
    }

    async fn set_mode(&mut self, mode: Mode) {
        if !self.state.is_auto_manual_virtual {
            debug!(equipment = %self.config.name, "SetMode ignored: mode switch is physical");
            return;
        }
        let Some(point) = self.config.points.auto_manual.clone() else {
            return;
        };
        if let Err(e) = self.ports.io.write_bit(&point, mode.as_bit()).await {
            warn!(equipment = %self.config.name, "Mode write failed: {}", e);
            self.apply_error(Some(ErrorKind::CommandFailed)).await;
            return;
        }

        let from = self.state.mode;
        self.state.mode = mode;
        self.last_mode = Some(mode);
        if from != mode {
            info!(equipment = %self.config.name, "Mode set {} -> {}", from, mode);
            self.ports.events.record(EquipmentEvent::ModeChanged {
                name: self.config.name.clone(),
                from,
                to: mode,
                triggered_by: TriggeredBy::Operator,
            });
        }

        if mode == Mode::Auto && (self.state.front_coil_on || self.state.back_coil_on) {
            if let Err(e) = self.halt(Instant::now()).await {
                warn!(equipment = %self.config.name, "Stop on mode change failed: {}", e);
                self.apply_error(Some(ErrorKind::CommandFailed)).await;
                return;
            }
        }
        self.refresh().await;
    }
}

impl<G: FieldIo, I: InterlockClient, E: EventSink> Reconciler for PositionalController<G, I, E> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn poll_interval(&self) -> Duration {
        self.config.poll_interval()
    }

    async fn poll(&mut self) {
        self.refresh().await;
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::MoveTo(target) => self.move_to(target).await,
            Command::StopMovement => self.stop_movement().await,
            Command::SetMode(mode) => self.set_mode(mode).await,
            Command::TurnOn | Command::TurnOff => {
                debug!(equipment = %self.config.name, "Ignoring {} on positional equipment", command)
            }
        }
    }

    fn status(&self) -> EquipmentStatus {
        EquipmentStatus::from_positional(&self.config, &self.state)
    }
}
