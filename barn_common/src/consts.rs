//! System-wide constants for the barn workspace.
//!
//! Single source of truth for default timings and paths.
//! Imported by all crates; do not redefine these elsewhere.

/// Default poll interval of an equipment actor in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Consecutive mismatch polls required before a mismatch fault is surfaced.
pub const DEFAULT_ERROR_DEBOUNCE_THRESHOLD: u32 = 3;

/// Bound on a single field bus read or write in milliseconds.
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 300;

/// Bound on a single interlock query in milliseconds.
pub const DEFAULT_INTERLOCK_TIMEOUT_MS: u64 = 300;

/// Delay before a crashed actor is restarted, in milliseconds.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 1000;

/// Capacity of an actor's command mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Interval of the periodic status report in seconds.
pub const DEFAULT_STATUS_REPORT_INTERVAL_S: u64 = 60;

/// Window after a movement command during which mismatch faults are suppressed.
pub const MOVEMENT_GRACE_MS: u64 = 2000;

/// Default configuration directory path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/barn/config";
