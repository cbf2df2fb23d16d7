//! Actor supervisor.
//!
//! Starts one actor per equipment and restarts it when it panics. A
//! restarted actor keeps nothing from its predecessor except the static
//! configuration: it starts from a state tagged `crashedPreviously` and
//! re-derives everything else from its first poll.
//!
//! Requires unwinding panics; with `panic = "abort"` the first panic takes
//! the whole process down.

use barn_common::config::ControlConfig;
use barn_common::equipment::config::{EquipmentConfig, EquipmentKind};
use barn_common::equipment::status::EquipmentStatus;
use barn_common::io::gateway::FieldIo;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::actor::{Command, Ports, Reconciler, run_actor};
use crate::binary::BinaryController;
use crate::directory::{Directory, EquipmentHandle};
use crate::error::ControlError;
use crate::events::EventSink;
use crate::interlock::InterlockClient;
use crate::positional::PositionalController;

// ─── Controller ─────────────────────────────────────────────────────

/// Either controller kind behind one [`Reconciler`].
enum Controller<G, I, E> {
    Binary(BinaryController<G, I, E>),
    Positional(PositionalController<G, I, E>),
}

impl<G: FieldIo, I: InterlockClient, E: EventSink> Controller<G, I, E> {
    fn build(
        config: &EquipmentConfig,
        ports: Ports<G, I, E>,
        crashed: bool,
    ) -> Result<Self, ControlError> {
        let config = config.clone();
        Ok(match (config.kind, crashed) {
            (EquipmentKind::Binary, false) => Self::Binary(BinaryController::new(config, ports)?),
            (EquipmentKind::Binary, true) => {
                Self::Binary(BinaryController::restarted(config, ports)?)
            }
            (EquipmentKind::Positional, false) => {
                Self::Positional(PositionalController::new(config, ports)?)
            }
            (EquipmentKind::Positional, true) => {
                Self::Positional(PositionalController::restarted(config, ports)?)
            }
        })
    }
}

impl<G: FieldIo, I: InterlockClient, E: EventSink> Reconciler for Controller<G, I, E> {
    fn name(&self) -> &str {
        match self {
            Self::Binary(c) => c.name(),
            Self::Positional(c) => c.name(),
        }
    }

    fn poll_interval(&self) -> Duration {
        match self {
            Self::Binary(c) => c.poll_interval(),
            Self::Positional(c) => c.poll_interval(),
        }
    }

    async fn poll(&mut self) {
        match self {
            Self::Binary(c) => c.poll().await,
            Self::Positional(c) => c.poll().await,
        }
    }

    async fn handle(&mut self, command: Command) {
        match self {
            Self::Binary(c) => c.handle(command).await,
            Self::Positional(c) => c.handle(command).await,
        }
    }

    fn status(&self) -> EquipmentStatus {
        match self {
            Self::Binary(c) => c.status(),
            Self::Positional(c) => c.status(),
        }
    }
}

// ─── Bookkeeping ────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Roster {
    /// Names with a live supervising task.
    active: HashSet<String>,
    restarts: HashMap<String, u32>,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Mailbox and status channel of one actor incarnation.
fn wire<G: FieldIo, I: InterlockClient, E: EventSink>(
    config: &Arc<EquipmentConfig>,
    controller: &Controller<G, I, E>,
    capacity: usize,
) -> (
    EquipmentHandle,
    mpsc::Receiver<Command>,
    watch::Sender<EquipmentStatus>,
) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (status_tx, status_rx) = watch::channel(controller.status());
    (EquipmentHandle::new(Arc::clone(config), tx, status_rx), rx, status_tx)
}

/// Everything a supervising task needs to rebuild its actor.
struct Restarter<G, I, E> {
    config: Arc<EquipmentConfig>,
    ports: Ports<G, I, E>,
    directory: Directory,
    roster: Arc<Mutex<Roster>>,
    delay: Duration,
    max_restarts: u32,
    capacity: usize,
}

impl<G: FieldIo, I: InterlockClient, E: EventSink> Restarter<G, I, E> {
    async fn supervise(
        self,
        mut controller: Controller<G, I, E>,
        mut mailbox: mpsc::Receiver<Command>,
        mut status: watch::Sender<EquipmentStatus>,
    ) {
        let name = self.config.name.clone();
        loop {
            let outcome = AssertUnwindSafe(run_actor(controller, mailbox, status))
                .catch_unwind()
                .await;
            let payload = match outcome {
                Ok(()) => {
                    debug!(equipment = %name, "Actor finished");
                    break;
                }
                Err(payload) => payload,
            };

            let count = {
                let mut roster = self.roster.lock();
                let count = roster.restarts.entry(name.clone()).or_insert(0);
                *count += 1;
                *count
            };
            error!(
                equipment = %name,
                "Actor panicked: {} (restart #{})",
                panic_message(&*payload),
                count
            );

            if self.max_restarts > 0 && count > self.max_restarts {
                let err = ControlError::RestartsExhausted {
                    equipment: name.clone(),
                    max: self.max_restarts,
                };
                error!(equipment = %name, "{}", err);
                self.directory.remove(&name);
                break;
            }

            tokio::time::sleep(self.delay).await;

            controller = match Controller::build(&self.config, self.ports.clone(), true) {
                Ok(controller) => controller,
                Err(e) => {
                    error!(equipment = %name, "Rebuild failed: {}", e);
                    self.directory.remove(&name);
                    break;
                }
            };
            let (handle, new_mailbox, new_status) = wire(&self.config, &controller, self.capacity);
            self.directory.register(handle);
            mailbox = new_mailbox;
            status = new_status;
            info!(equipment = %name, "Actor restarted");
        }
        self.roster.lock().active.remove(&name);
    }
}

// ─── Supervisor ─────────────────────────────────────────────────────

/// Owns every equipment actor of one process.
pub struct Supervisor<G, I, E> {
    gateway: Arc<G>,
    interlocks: Arc<I>,
    events: Arc<E>,
    control: ControlConfig,
    directory: Directory,
    tasks: Mutex<JoinSet<()>>,
    roster: Arc<Mutex<Roster>>,
}

impl<G: FieldIo, I: InterlockClient, E: EventSink> Supervisor<G, I, E> {
    pub fn new(
        gateway: Arc<G>,
        interlocks: Arc<I>,
        events: Arc<E>,
        control: ControlConfig,
        directory: Directory,
    ) -> Self {
        Self {
            gateway,
            interlocks,
            events,
            control,
            directory,
            tasks: Mutex::new(JoinSet::new()),
            roster: Arc::new(Mutex::new(Roster::default())),
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    fn ports(&self) -> Ports<G, I, E> {
        Ports::new(
            Arc::clone(&self.gateway),
            self.control.io_timeout(),
            Arc::clone(&self.interlocks),
            self.control.interlock_timeout(),
            Arc::clone(&self.events),
        )
    }

    /// Return the running actor for `config.name`, starting it if needed.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `MissingPoint` if a point required by the kind is unbound
    /// - `InvalidConfig` if the record fails validation
    pub fn ensure_started(&self, config: EquipmentConfig) -> Result<EquipmentHandle, ControlError> {
        if self.roster.lock().active.contains(&config.name) {
            if let Ok(handle) = self.directory.lookup(&config.name) {
                return Ok(handle);
            }
        }

        for &role in config.required_roles() {
            if config.points.get(role).is_none() {
                return Err(ControlError::MissingPoint {
                    equipment: config.name.clone(),
                    role,
                });
            }
        }
        config.validate()?;

        let config = Arc::new(config);
        let controller = Controller::build(&config, self.ports(), false)?;
        let (handle, mailbox, status) = wire(&config, &controller, self.control.mailbox_capacity);
        self.directory.register(handle.clone());
        self.roster.lock().active.insert(config.name.clone());

        let restarter = Restarter {
            config: Arc::clone(&config),
            ports: self.ports(),
            directory: self.directory.clone(),
            roster: Arc::clone(&self.roster),
            delay: self.control.restart_delay(),
            max_restarts: self.control.max_restarts,
            capacity: self.control.mailbox_capacity,
        };
        self.tasks
            .lock()
            .spawn(restarter.supervise(controller, mailbox, status));

        info!(
            equipment = %config.name,
            kind = ?config.kind,
            "Actor started (poll every {:?})",
            config.poll_interval()
        );
        Ok(handle)
    }

    /// Start every record; failures are logged and returned, the rest run.
    pub fn start_all(&self, configs: &[EquipmentConfig]) -> Vec<ControlError> {
        let mut failures = Vec::new();
        for config in configs {
            if let Err(e) = self.ensure_started(config.clone()) {
                warn!(equipment = %config.name, "Not started: {}", e);
                failures.push(e);
            }
        }
        failures
    }

    /// Number of panics recovered (or not) for `name`.
    pub fn restart_count(&self, name: &str) -> u32 {
        self.roster.lock().restarts.get(name).copied().unwrap_or(0)
    }

    /// Stop every actor and empty the directory.
    pub async fn shutdown(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        self.directory.clear();
        tasks.shutdown().await;
        self.roster.lock().active.clear();
        info!("All actors stopped");
    }
}
