//! Simulation driver.
//!
//! An in-memory field bus: named integer points, linked reactions between
//! points, and fault injection for exercising error paths without hardware.

mod bus;
mod points;

pub use bus::{SimulatedFieldBus, WriteRecord};
pub use points::PointTable;
