//! Field I/O gateway port.
//!
//! The low-level field bus driver is consumed through [`FieldIo`]: typed reads
//! and writes on named digital points. Reads may come from a cache or go
//! straight to the device; callers treat both as "best available snapshot,
//! may fail".

use core::future::Future;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw value of a field point as reported by the gateway.
///
/// Control logic treats `state` as a two-valued signal. Anything other than
/// `0` or `1` is malformed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointState {
    pub state: i64,
}

impl PointState {
    pub const OFF: Self = Self { state: 0 };
    pub const ON: Self = Self { state: 1 };

    /// Build a point value from a bit.
    #[inline]
    pub const fn from_bit(bit: bool) -> Self {
        if bit { Self::ON } else { Self::OFF }
    }

    /// Interpret the value as a bit. Returns `None` for anything but 0/1.
    #[inline]
    pub const fn as_bit(&self) -> Option<bool> {
        match self.state {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }
}

/// Error types for field gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// The call did not complete within its bound.
    #[error("field bus timeout on point '{0}'")]
    Timeout(String),

    /// Device or gateway unreachable.
    #[error("point '{point}' unreachable: {reason}")]
    Unreachable { point: String, reason: String },

    /// The gateway does not know this point.
    #[error("unknown point '{0}'")]
    UnknownPoint(String),

    /// The write was delivered but refused.
    #[error("write to '{point}' rejected: {reason}")]
    Rejected { point: String, reason: String },

    /// The point reported a value outside the two-valued range.
    #[error("point '{point}' reported invalid value {value}")]
    InvalidValue { point: String, value: i64 },
}

impl IoError {
    /// True when the failure concerns data shape rather than communication.
    pub fn is_invalid_data(&self) -> bool {
        matches!(self, Self::InvalidValue { .. })
    }
}

/// Trait defining the interface of a field I/O gateway.
///
/// Implementations must be cheap to share: every equipment actor holds an
/// `Arc` to the same gateway and may call it concurrently. Calls are bounded
/// by the caller; implementations need not apply their own timeout.
pub trait FieldIo: Send + Sync + 'static {
    /// Read the current value of a named point.
    fn read_point(&self, name: &str) -> impl Future<Output = Result<PointState, IoError>> + Send;

    /// Write a value to a named point.
    fn write_point(
        &self,
        name: &str,
        value: PointState,
    ) -> impl Future<Output = Result<(), IoError>> + Send;
}
