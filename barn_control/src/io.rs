//! Bounded field I/O.
//!
//! `IoLink` is the only way controllers touch the gateway. Every call is
//! bounded by the configured I/O timeout, and reads are checked for the
//! two-valued shape before they reach control logic.

use barn_common::equipment::error::ErrorKind;
use barn_common::io::gateway::{FieldIo, IoError, PointState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Map a gateway failure to the equipment fault it causes on a read.
pub fn read_fault(err: &IoError) -> ErrorKind {
    if err.is_invalid_data() {
        ErrorKind::InvalidData
    } else {
        ErrorKind::Timeout
    }
}

/// Gateway handle with a per-call timeout.
pub struct IoLink<G> {
    gateway: Arc<G>,
    timeout: Duration,
}

impl<G> Clone for IoLink<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            timeout: self.timeout,
        }
    }
}

impl<G: FieldIo> IoLink<G> {
    pub fn new(gateway: Arc<G>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Read a point as a bit.
    ///
    /// Timeouts and gateway errors map to `Timeout`; a value other than 0/1
    /// maps to `InvalidData`.
    pub async fn read_bit(&self, point: &str) -> Result<bool, ErrorKind> {
        let value = match timeout(self.timeout, self.gateway.read_point(point)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                debug!("read {} failed: {}", point, e);
                return Err(read_fault(&e));
            }
            Err(_) => {
                debug!("read {} timed out after {:?}", point, self.timeout);
                return Err(ErrorKind::Timeout);
            }
        };
        value.as_bit().ok_or_else(|| {
            debug!("read {} returned non-binary value {}", point, value.state);
            ErrorKind::InvalidData
        })
    }

    /// Read an optional point. Unbound points read as `None`.
    pub async fn read_opt(&self, point: Option<&str>) -> Result<Option<bool>, ErrorKind> {
        match point {
            Some(point) => self.read_bit(point).await.map(Some),
            None => Ok(None),
        }
    }

    /// Write a bit.
    pub async fn write_bit(&self, point: &str, bit: bool) -> Result<(), IoError> {
        match timeout(self.timeout, self.gateway.write_point(point, PointState::from_bit(bit))).await
        {
            Ok(result) => result,
            Err(_) => Err(IoError::Timeout(point.to_string())),
        }
    }
}
