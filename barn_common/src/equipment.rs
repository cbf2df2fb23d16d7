//! Equipment model shared by controllers and consumers.
//!
//! - [`config`] - Static equipment records
//! - [`error`] - Fault taxonomy
//! - [`event`] - Event logger records
//! - [`state`] - Actor-owned mutable state
//! - [`status`] - Published status payload

pub mod config;
pub mod error;
pub mod event;
pub mod state;
pub mod status;
