//! Barn Common Library
//!
//! This crate provides shared types, constants and configuration loading
//! utilities for all barn workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide defaults
//! - [`equipment`] - Equipment configuration, state, status payload, faults and events
//! - [`hal`] - Simulated field bus configuration
//! - [`io`] - Point roles and the field I/O gateway port
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! barn_common = { path = "../barn_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use barn_common::config::{ConfigLoader, SharedConfig};
//! use barn_common::equipment::error::ErrorKind;
//! ```

pub mod config;
pub mod consts;
pub mod equipment;
pub mod hal;
pub mod io;
pub mod prelude;
