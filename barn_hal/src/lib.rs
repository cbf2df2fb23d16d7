//! # Barn HAL Library
//!
//! Field I/O gateways implementing [`barn_common::io::gateway::FieldIo`].
//!
//! # Module Structure
//!
//! - [`drivers`] - Gateway implementations and driver selection
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐      ┌──────────────────────────────┐
//! │  barn_control     │      │  barn_hal                    │
//! │  equipment actors │─────►│  FieldIo impl                │
//! │  (IoLink timeout) │      │  ┌────────────────────────┐  │
//! └───────────────────┘      │  │ SimulatedFieldBus      │  │
//!                            │  │  PointTable + faults   │  │
//!                            │  └────────────────────────┘  │
//!                            └──────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod drivers;

pub use crate::drivers::simulation::{SimulatedFieldBus, WriteRecord};
pub use crate::drivers::{DriverError, SIMULATION_DRIVER, create_driver};
