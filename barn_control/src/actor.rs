//! Equipment actor loop.
//!
//! One actor per equipment. The loop alternates between its poll timer and
//! its command mailbox, so polls and commands never overlap, and publishes
//! a status snapshot after each of them.

use barn_common::equipment::event::TriggeredBy;
use barn_common::equipment::state::{Mode, MoveTarget};
use barn_common::equipment::status::EquipmentStatus;
use barn_common::io::gateway::FieldIo;
use core::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::events::EventSink;
use crate::interlock::{InterlockClient, InterlockGate};
use crate::io::IoLink;

// ─── Command ────────────────────────────────────────────────────────

/// Intent message addressed to one equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TurnOn,
    TurnOff,
    MoveTo(MoveTarget),
    StopMovement,
    SetMode(Mode),
}

impl Command {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::MoveTo(MoveTarget::Front) => "move_to_front_limit",
            Self::MoveTo(MoveTarget::Back) => "move_to_back_limit",
            Self::StopMovement => "stop_movement",
            Self::SetMode(_) => "set_mode",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started a reconciliation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Poll,
    Command,
}

impl Origin {
    pub const fn triggered_by(&self) -> TriggeredBy {
        match self {
            Self::Poll => TriggeredBy::Controller,
            Self::Command => TriggeredBy::Operator,
        }
    }
}

// ─── Ports ──────────────────────────────────────────────────────────

/// External collaborators shared by every controller.
pub struct Ports<G, I, E> {
    pub io: IoLink<G>,
    pub gate: InterlockGate<I>,
    pub events: Arc<E>,
}

impl<G, I, E> Clone for Ports<G, I, E> {
    fn clone(&self) -> Self {
        Self {
            io: self.io.clone(),
            gate: self.gate.clone(),
            events: Arc::clone(&self.events),
        }
    }
}

impl<G: FieldIo, I: InterlockClient, E: EventSink> Ports<G, I, E> {
    pub fn new(
        gateway: Arc<G>,
        io_timeout: Duration,
        interlocks: Arc<I>,
        interlock_timeout: Duration,
        events: Arc<E>,
    ) -> Self {
        Self {
            io: IoLink::new(gateway, io_timeout),
            gate: InterlockGate::new(interlocks, interlock_timeout),
            events,
        }
    }
}

// ─── Reconciler ─────────────────────────────────────────────────────

/// A controller driven by the actor loop.
pub trait Reconciler: Send + 'static {
    fn name(&self) -> &str;

    fn poll_interval(&self) -> Duration;

    /// One poll-and-reconcile cycle.
    fn poll(&mut self) -> impl Future<Output = ()> + Send;

    /// Apply one command.
    fn handle(&mut self, command: Command) -> impl Future<Output = ()> + Send;

    /// Snapshot of the current state.
    fn status(&self) -> EquipmentStatus;
}

/// Run `reconciler` until its mailbox closes.
///
/// The first poll runs immediately. Missed ticks are delayed, not bunched.
pub async fn run_actor<R: Reconciler>(
    mut reconciler: R,
    mut mailbox: mpsc::Receiver<Command>,
    status: watch::Sender<EquipmentStatus>,
) {
    let mut ticker = interval(reconciler.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => reconciler.poll().await,
            command = mailbox.recv() => match command {
                Some(command) => {
                    debug!(equipment = %reconciler.name(), "Command {}", command);
                    reconciler.handle(command).await;
                }
                None => break,
            },
        }
        status.send_replace(reconciler.status());
    }

    debug!(equipment = %reconciler.name(), "Mailbox closed, actor stopping");
}
