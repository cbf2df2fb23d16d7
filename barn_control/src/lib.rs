//! # Barn Control Library
//!
//! Reconciliation engine for barn equipment. Every fan, pump, light, conveyor
//! or feeder is one independent actor that keeps what was commanded and what
//! the hardware reports in agreement, over an unreliable field bus.
//!
//! ## Layers
//!
//! 1. **Policy**: [`debounce`], pure error classification
//! 2. **Controllers**: [`binary`] (single coil) and [`positional`] (dual coil, limit switches)
//! 3. **Runtime**: [`actor`] loop, [`directory`] name lookup, [`supervisor`] restart
//! 4. **Adapters**: [`io`] bounded field I/O, [`interlock`] fail-open gate, [`events`] logger sinks
//!
//! ## Concurrency
//!
//! One tokio task per equipment. Polls and commands of one actor are strictly
//! sequential; actors never call each other. Status is published through a
//! `watch` channel so readers never wait on an in-flight poll.

pub mod actor;
pub mod binary;
pub mod debounce;
pub mod directory;
pub mod error;
pub mod events;
pub mod interlock;
pub mod io;
pub mod positional;
pub mod supervisor;

pub use crate::actor::{Command, Ports, Reconciler};
pub use crate::directory::{Directory, EquipmentHandle};
pub use crate::error::ControlError;
pub use crate::supervisor::Supervisor;
