//! Binary (single coil) equipment controller.
//!
//! Fans, pumps, lights, conveyors, sirens. One coil drives the equipment;
//! optional inputs report running feedback, the panel mode switch and the
//! motor protection trip. The controller branches on the configured
//! features at run time.
//!
//! ## Poll cycle
//!
//! 1. Read coil, feedback, mode and trip points.
//! 2. Any read failure: safe state, error surfaced at once, no writes.
//! 3. Decode observed state (`actual_on` honours NC inversion).
//! 4. Panel switch back to auto: drop intent, switch off if running.
//! 5. Classify and debounce the raw fault.
//! 6. Drive the coil towards `commanded_on`, then re-read.
//!
//! Under a physical manual switch the controller only observes.

use barn_common::equipment::config::EquipmentConfig;
use barn_common::equipment::error::ErrorKind;
use barn_common::equipment::event::{EquipmentEvent, Metadata, TriggeredBy};
use barn_common::equipment::state::{BinaryState, Mode};
use barn_common::equipment::status::EquipmentStatus;
use barn_common::io::gateway::FieldIo;
use barn_common::io::role::PointRole;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::actor::{Command, Origin, Ports, Reconciler};
use crate::debounce::debounce;
use crate::error::ControlError;
use crate::events::EventSink;
use crate::interlock::InterlockClient;

/// Raw fault of one binary poll, in priority order.
///
/// Mismatch checks are skipped when `check_mismatch` is false (panel
/// override); a trip is always reported.
pub fn classify(
    actual_on: bool,
    is_running: bool,
    is_tripped: bool,
    check_mismatch: bool,
) -> Option<ErrorKind> {
    if is_tripped {
        Some(ErrorKind::Tripped)
    } else if !check_mismatch {
        None
    } else if actual_on && !is_running {
        Some(ErrorKind::OnButNotRunning)
    } else if !actual_on && is_running {
        Some(ErrorKind::OffButRunning)
    } else {
        None
    }
}

/// Raw point values of one poll.
#[derive(Debug, Clone, Copy)]
struct Readings {
    coil: bool,
    feedback: Option<bool>,
    mode: Option<bool>,
    trip: Option<bool>,
}

pub struct BinaryController<G, I, E> {
    config: EquipmentConfig,
    coil: String,
    ports: Ports<G, I, E>,
    state: BinaryState,
    /// Last poll read every input successfully.
    inputs_ok: bool,
    /// `commanded_on` holds real intent (seeded from hardware or commanded).
    seeded: bool,
    /// Mode of the last successful read.
    last_mode: Option<Mode>,
}

impl<G: FieldIo, I: InterlockClient, E: EventSink> BinaryController<G, I, E> {
    /// Build a controller for a fresh start.
    pub fn new(config: EquipmentConfig, ports: Ports<G, I, E>) -> Result<Self, ControlError> {
        let state = BinaryState::initial(&config);
        Self::with_state(config, ports, state)
    }

    /// Build a controller after an abnormal stop: state tagged `crashedPreviously`.
    pub fn restarted(config: EquipmentConfig, ports: Ports<G, I, E>) -> Result<Self, ControlError> {
        let state = BinaryState::crashed(&config);
        Self::with_state(config, ports, state)
    }

    fn with_state(
        config: EquipmentConfig,
        ports: Ports<G, I, E>,
        state: BinaryState,
    ) -> Result<Self, ControlError> {
        let coil = config
            .points
            .on_off_coil
            .clone()
            .ok_or_else(|| ControlError::MissingPoint {
                equipment: config.name.clone(),
                role: PointRole::OnOffCoil,
            })?;
        Ok(Self {
            config,
            coil,
            ports,
            state,
            inputs_ok: false,
            seeded: false,
            last_mode: None,
        })
    }

    pub fn state(&self) -> &BinaryState {
        &self.state
    }

    pub fn config(&self) -> &EquipmentConfig {
        &self.config
    }

    /// Physical coil value for a commanded boolean.
    #[inline]
    fn coil_value(&self, on: bool) -> bool {
        on != self.config.inverted
    }

    fn optional_point(&self, role: PointRole, enabled: bool) -> Option<&str> {
        if enabled {
            self.config.points.get(role)
        } else {
            None
        }
    }

    async fn read_inputs(&self) -> Result<Readings, ErrorKind> {
        let io = &self.ports.io;
        let coil = io.read_bit(&self.coil).await?;
        let feedback = io
            .read_opt(self.optional_point(
                PointRole::RunningFeedback,
                self.config.running_feedback_enabled(),
            ))
            .await?;
        let mode = io
            .read_opt(self.optional_point(PointRole::AutoManual, self.config.auto_manual_enabled()))
            .await?;
        let trip = io
            .read_opt(self.optional_point(PointRole::Trip, self.config.trip_signal_enabled()))
            .await?;
        Ok(Readings {
            coil,
            feedback,
            mode,
            trip,
        })
    }

    // ─── Poll path ──────────────────────────────────────────────────

    /// Read hardware and re-derive observed state.
    ///
    /// Returns `true` when coil synchronization may follow.
    async fn refresh(&mut self) -> bool {
        let readings = match self.read_inputs().await {
            Ok(readings) => readings,
            Err(kind) => {
                self.enter_safe_state(kind).await;
                return false;
            }
        };
        self.inputs_ok = true;

        let actual_on = readings.coil != self.config.inverted;
        self.state.actual_on = actual_on;
        self.state.is_running = readings.feedback.unwrap_or(actual_on);
        self.state.is_tripped = readings.trip.unwrap_or(false);
        self.state.mode = if self.config.always_manual {
            Mode::Manual
        } else {
            readings.mode.map(Mode::from_bit).unwrap_or(Mode::Auto)
        };
        if !self.seeded {
            self.state.commanded_on = actual_on;
            self.seeded = true;
        }

        let mut force_off = false;
        if let Some(previous) = self.last_mode.replace(self.state.mode) {
            if previous != self.state.mode {
                force_off = self.on_mode_observed(previous);
            }
        }

        let raw = classify(
            self.state.actual_on,
            self.state.is_running,
            self.state.is_tripped,
            !self.state.is_physical_manual(),
        );
        self.apply_error(raw).await;

        if force_off {
            self.switch_off_after_handover().await;
            return false;
        }
        true
    }

    /// Record a mode change seen on the mode point.
    ///
    /// Returns `true` when the equipment must be switched off because a
    /// physical switch handed control back to software.
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

        let handover = previous == Mode::Manual
            && current == Mode::Auto
            && !self.state.is_auto_manual_virtual
            && !self.config.always_manual;
        if !handover {
            return false;
        }
        self.state.commanded_on = false;
        self.state.actual_on
    }

    async fn switch_off_after_handover(&mut self) {
        let value = self.coil_value(false);
        match self.ports.io.write_bit(&self.coil, value).await {
            Ok(()) => info!(equipment = %self.config.name, "Returned to auto, switching off"),
            Err(e) => {
                warn!(equipment = %self.config.name, "Switch-off after handover failed: {}", e);
                self.apply_error(Some(ErrorKind::CommandFailed)).await;
            }
        }
    }

    async fn enter_safe_state(&mut self, kind: ErrorKind) {
        self.inputs_ok = false;
        self.state.actual_on = false;
        self.state.is_running = false;
        self.state.is_tripped = false;
        self.state.mode = Mode::fallback(self.config.always_manual);
        self.apply_error(Some(kind)).await;
    }

    /// Debounce `raw` into the surfaced error and report any change.
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
        self.state.interlocked = if self.state.error.is_none() && !self.state.is_running {
            !self.ports.gate.allows(&self.config.name).await
        } else {
            false
        };
    }

    /// Drive the coil towards `commanded_on`.
    async fn sync(&mut self, origin: Origin) {
        if !self.inputs_ok {
            return;
        }
        if self.state.is_physical_manual() {
            if origin == Origin::Command {
                self.refresh().await;
            }
            return;
        }
        if self.state.commanded_on == self.state.actual_on {
            return;
        }

        let on = self.state.commanded_on;
        let from_state = self.state.label();
        let value = self.coil_value(on);
        if let Err(e) = self.ports.io.write_bit(&self.coil, value).await {
            warn!(equipment = %self.config.name, "Coil write failed: {}", e);
            self.apply_error(Some(ErrorKind::CommandFailed)).await;
            return;
        }
        debug!(
            equipment = %self.config.name,
            "Coil {} <- {} ({})",
            self.coil,
            u8::from(value),
            if on { "on" } else { "off" }
        );

        if self.state.mode == Mode::Manual {
            let name = self.config.name.clone();
            let mode = self.state.mode;
            let triggered_by = origin.triggered_by();
            self.ports.events.record(if on {
                EquipmentEvent::Started {
                    name,
                    mode,
                    triggered_by,
                    metadata: Metadata::new(),
                }
            } else {
                EquipmentEvent::Stopped {
                    name,
                    mode,
                    triggered_by,
                    from_state: from_state.to_string(),
                    metadata: Metadata::new(),
                }
            });
        }

        self.refresh().await;
    }

    // ─── Command path ───────────────────────────────────────────────

    async fn turn_on(&mut self) {
        if self.state.is_physical_manual() {
            debug!(equipment = %self.config.name, "TurnOn ignored: panel has control");
            return;
        }
        if !self.ports.gate.allows(&self.config.name).await {
            info!(equipment = %self.config.name, "Start blocked by interlock");
            self.state.interlocked = true;
            self.ports.events.record(EquipmentEvent::InterlockBlocked {
                name: self.config.name.clone(),
                mode: self.state.mode,
            });
            return;
        }
        self.state.interlocked = false;
        self.state.commanded_on = true;
        self.seeded = true;
        self.sync(Origin::Command).await;
    }

    async fn turn_off(&mut self) {
        if self.state.is_physical_manual() {
            debug!(equipment = %self.config.name, "TurnOff ignored: panel has control");
            return;
        }
        self.state.commanded_on = false;
        self.seeded = true;
        self.sync(Origin::Command).await;
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
        if mode == Mode::Auto {
            self.state.commanded_on = false;
            self.seeded = true;
        }
        if from != mode {
            info!(equipment = %self.config.name, "Mode set {} -> {}", from, mode);
            self.ports.events.record(EquipmentEvent::ModeChanged {
                name: self.config.name.clone(),
                from,
                to: mode,
                triggered_by: TriggeredBy::Operator,
            });
        }
        self.sync(Origin::Command).await;
    }
}

impl<G: FieldIo, I: InterlockClient, E: EventSink> Reconciler for BinaryController<G, I, E> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn poll_interval(&self) -> Duration {
        self.config.poll_interval()
    }

    async fn poll(&mut self) {
        if self.refresh().await {
            self.sync(Origin::Poll).await;
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::TurnOn => self.turn_on().await,
            Command::TurnOff => self.turn_off().await,
            Command::SetMode(mode) => self.set_mode(mode).await,
            Command::MoveTo(_) | Command::StopMovement => {
                debug!(equipment = %self.config.name, "Ignoring {} on binary equipment", command)
            }
        }
    }

    fn status(&self) -> EquipmentStatus {
        EquipmentStatus::from_binary(&self.config, &self.state)
    }
}
