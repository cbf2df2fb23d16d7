//! Name → actor handle registry.
//!
//! The directory is the only way to address an equipment actor. Commands
//! are enqueued without waiting; status reads return the last published
//! snapshot and never wait for an in-flight poll.

use barn_common::equipment::config::{EquipmentConfig, EquipmentKind};
use barn_common::equipment::state::{Mode, MoveTarget};
use barn_common::equipment::status::EquipmentStatus;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

use crate::actor::Command;
use crate::error::ControlError;

// ─── EquipmentHandle ────────────────────────────────────────────────

/// Cheap, cloneable address of one equipment actor.
#[derive(Debug, Clone)]
pub struct EquipmentHandle {
    config: Arc<EquipmentConfig>,
    mailbox: mpsc::Sender<Command>,
    status: watch::Receiver<EquipmentStatus>,
}

impl EquipmentHandle {
    pub fn new(
        config: Arc<EquipmentConfig>,
        mailbox: mpsc::Sender<Command>,
        status: watch::Receiver<EquipmentStatus>,
    ) -> Self {
        Self {
            config,
            mailbox,
            status,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn kind(&self) -> EquipmentKind {
        self.config.kind
    }

    pub fn config(&self) -> &EquipmentConfig {
        &self.config
    }

    /// The actor is still draining its mailbox.
    pub fn is_alive(&self) -> bool {
        !self.mailbox.is_closed()
    }

    fn accepts(&self, command: Command) -> bool {
        match (self.config.kind, command) {
            (_, Command::SetMode(_)) => true,
            (EquipmentKind::Binary, Command::TurnOn | Command::TurnOff) => true,
            (EquipmentKind::Positional, Command::MoveTo(_) | Command::StopMovement) => true,
            _ => false,
        }
    }

    /// Enqueue `command` without waiting.
    ///
    /// # Errors
    ///
    /// - `UnsupportedCommand` if the kind has no such operation
    /// - `MailboxFull` if the actor is backlogged
    /// - `ActorStopped` if the actor is gone
    pub fn send(&self, command: Command) -> Result<(), ControlError> {
        if !self.accepts(command) {
            return Err(ControlError::UnsupportedCommand {
                equipment: self.config.name.clone(),
                command: command.as_str(),
            });
        }
        self.mailbox.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => ControlError::MailboxFull(self.config.name.clone()),
            TrySendError::Closed(_) => ControlError::ActorStopped(self.config.name.clone()),
        })
    }

    /// Last published snapshot.
    ///
    /// When the actor is gone a placeholder tagged `crashedPreviously` is
    /// returned instead.
    pub fn status(&self) -> EquipmentStatus {
        if self.status.has_changed().is_err() {
            return EquipmentStatus::placeholder(&self.config);
        }
        self.status.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<EquipmentStatus> {
        self.status.clone()
    }
}

// ─── Directory ──────────────────────────────────────────────────────

/// Shared, concurrent-safe registry of running actors.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    handles: Arc<RwLock<HashMap<String, EquipmentHandle>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Result<EquipmentHandle, ControlError> {
        self.handles
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ControlError::UnknownEquipment(name.to_string()))
    }

    /// Register `handle`, replacing any previous one under the same name.
    pub fn register(&self, handle: EquipmentHandle) {
        self.handles.write().insert(handle.name().to_string(), handle);
    }

    pub fn remove(&self, name: &str) -> Option<EquipmentHandle> {
        self.handles.write().remove(name)
    }

    pub fn clear(&self) {
        self.handles.write().clear();
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }

    pub fn send(&self, name: &str, command: Command) -> Result<(), ControlError> {
        self.lookup(name)?.send(command)
    }

    pub fn turn_on(&self, name: &str) -> Result<(), ControlError> {
        self.send(name, Command::TurnOn)
    }

    pub fn turn_off(&self, name: &str) -> Result<(), ControlError> {
        self.send(name, Command::TurnOff)
    }

    pub fn move_to(&self, name: &str, target: MoveTarget) -> Result<(), ControlError> {
        self.send(name, Command::MoveTo(target))
    }

    pub fn stop_movement(&self, name: &str) -> Result<(), ControlError> {
        self.send(name, Command::StopMovement)
    }

    pub fn set_mode(&self, name: &str, mode: Mode) -> Result<(), ControlError> {
        self.send(name, Command::SetMode(mode))
    }

    pub fn status(&self, name: &str) -> Result<EquipmentStatus, ControlError> {
        Ok(self.lookup(name)?.status())
    }

    /// Snapshots of every registered equipment, sorted by name.
    pub fn statuses(&self) -> Vec<EquipmentStatus> {
        let handles: Vec<EquipmentHandle> = self.handles.read().values().cloned().collect();
        let mut statuses: Vec<EquipmentStatus> = handles.iter().map(EquipmentHandle::status).collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }
}
