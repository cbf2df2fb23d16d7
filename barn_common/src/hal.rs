//! Field bus driver configuration.

pub mod config;
