//! Field point roles and the gateway port.

pub mod gateway;
pub mod role;
