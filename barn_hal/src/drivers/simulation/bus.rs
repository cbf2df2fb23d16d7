//! Simulated field bus.
//!
//! `SimulatedFieldBus` implements [`FieldIo`] over a [`PointTable`] and adds
//! fault injection:
//! - per-point or whole-bus outage (`Unreachable`)
//! - rejected writes (`Rejected`)
//! - raw values outside 0/1 (for invalid-data paths)
//! - a response latency applied before every answer (for timeouts)
//!
//! Every accepted write is recorded for inspection.

use barn_common::hal::config::{LinkedPoint, SimBusConfig};
use barn_common::io::gateway::{FieldIo, IoError, PointState};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::points::PointTable;

/// One accepted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    /// Point name.
    pub point: String,
    /// Value written.
    pub value: i64,
}

#[derive(Debug, Default)]
struct Faults {
    bus_offline: bool,
    offline: HashSet<String>,
    rejecting: HashSet<String>,
    latency: Duration,
}

#[derive(Debug, Default)]
struct BusInner {
    table: PointTable,
    faults: Faults,
    writes: Vec<WriteRecord>,
}

impl BusInner {
    fn check_reachable(&self, point: &str) -> Result<(), IoError> {
        if self.faults.bus_offline || self.faults.offline.contains(point) {
            return Err(IoError::Unreachable {
                point: point.to_string(),
                reason: "simulated outage".to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory field bus.
///
/// Cheap to share behind an `Arc`; all state sits behind one mutex that is
/// never held across an await.
#[derive(Debug, Default)]
pub struct SimulatedFieldBus {
    inner: Mutex<BusInner>,
}

impl SimulatedFieldBus {
    /// Empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus populated from `io.toml`.
    pub fn from_config(config: &SimBusConfig) -> Self {
        Self {
            inner: Mutex::new(BusInner {
                table: PointTable::from_config(config),
                ..BusInner::default()
            }),
        }
    }

    /// Builder: add a point.
    pub fn with_point(self, name: &str, initial: i64) -> Self {
        self.ensure_point(name, initial);
        self
    }

    /// Builder: add a linked reaction on `source`.
    pub fn with_link(self, source: &str, reaction: LinkedPoint) -> Self {
        self.inner.lock().table.link(source, reaction);
        self
    }

    /// Add a point if absent. Returns `true` when it was created.
    pub fn ensure_point(&self, name: &str, initial: i64) -> bool {
        self.inner.lock().table.ensure(name, initial)
    }

    /// Number of points.
    pub fn point_count(&self) -> usize {
        self.inner.lock().table.len()
    }

    // ─── Inspection ─────────────────────────────────────────────────

    /// Current raw value of a point.
    pub fn value(&self, point: &str) -> Option<i64> {
        self.inner.lock().table.read(point, Instant::now())
    }

    /// All accepted writes, oldest first.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.lock().writes.clone()
    }

    /// Accepted writes to one point, oldest first.
    pub fn writes_to(&self, point: &str) -> Vec<i64> {
        self.inner
            .lock()
            .writes
            .iter()
            .filter(|w| w.point == point)
            .map(|w| w.value)
            .collect()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.inner.lock().writes.clear();
    }

    // ─── Fault injection ────────────────────────────────────────────

    /// Set a point value as the field would, without triggering reactions.
    ///
    /// Any integer is accepted, including values outside 0/1.
    /// Returns `false` for an unknown point.
    pub fn set_raw(&self, point: &str, value: i64) -> bool {
        self.inner.lock().table.force(point, value)
    }

    /// Make one point unreachable (or reachable again).
    pub fn set_offline(&self, point: &str, offline: bool) {
        let mut inner = self.inner.lock();
        if offline {
            inner.faults.offline.insert(point.to_string());
        } else {
            inner.faults.offline.remove(point);
        }
    }

    /// Make the whole bus unreachable (or reachable again).
    pub fn set_bus_offline(&self, offline: bool) {
        self.inner.lock().faults.bus_offline = offline;
    }

    /// Refuse writes to a point.
    pub fn reject_writes(&self, point: &str, reject: bool) {
        let mut inner = self.inner.lock();
        if reject {
            inner.faults.rejecting.insert(point.to_string());
        } else {
            inner.faults.rejecting.remove(point);
        }
    }

    /// Delay applied before every read and write answer.
    pub fn set_response_latency(&self, latency: Duration) {
        self.inner.lock().faults.latency = latency;
    }

    async fn respond_after_latency(&self) {
        let latency = self.inner.lock().faults.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl FieldIo for SimulatedFieldBus {
    async fn read_point(&self, name: &str) -> Result<PointState, IoError> {
        self.respond_after_latency().await;

        let mut inner = self.inner.lock();
        inner.check_reachable(name)?;
        inner
            .table
            .read(name, Instant::now())
            .map(|state| PointState { state })
            .ok_or_else(|| IoError::UnknownPoint(name.to_string()))
    }

    async fn write_point(&self, name: &str, value: PointState) -> Result<(), IoError> {
        self.respond_after_latency().await;

        let mut inner = self.inner.lock();
        inner.check_reachable(name)?;
        if inner.faults.rejecting.contains(name) {
            return Err(IoError::Rejected {
                point: name.to_string(),
                reason: "simulated rejection".to_string(),
            });
        }
        if !inner.table.write(name, value.state, Instant::now()) {
            return Err(IoError::UnknownPoint(name.to_string()));
        }
        debug!("{} <- {}", name, value.state);
        inner.writes.push(WriteRecord {
            point: name.to_string(),
            value: value.state,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> SimulatedFieldBus {
        SimulatedFieldBus::new()
            .with_point("C1", 0)
            .with_point("F1", 0)
            .with_link(
                "C1",
                LinkedPoint {
                    trigger: true,
                    delay_s: 0.5,
                    point: "F1".to_string(),
                    result: true,
                },
            )
    }

    #[tokio::test(start_paused = true)]
    async fn write_then_read() {
        let bus = bus();
        bus.write_point("C1", PointState::ON).await.unwrap();
        assert_eq!(bus.read_point("C1").await.unwrap(), PointState::ON);
        assert_eq!(bus.writes_to("C1"), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn linked_feedback_follows_coil() {
        let bus = bus();
        bus.write_point("C1", PointState::ON).await.unwrap();
        assert_eq!(bus.read_point("F1").await.unwrap(), PointState::OFF);

        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(bus.read_point("F1").await.unwrap(), PointState::ON);
    }

    #[tokio::test]
    async fn unknown_point() {
        let bus = bus();
        assert_eq!(
            bus.read_point("X").await,
            Err(IoError::UnknownPoint("X".to_string()))
        );
        assert!(bus.write_point("X", PointState::ON).await.is_err());
        assert!(bus.writes().is_empty());
    }

    #[tokio::test]
    async fn offline_point_unreachable() {
        let bus = bus();
        bus.set_offline("F1", true);
        assert!(matches!(
            bus.read_point("F1").await,
            Err(IoError::Unreachable { .. })
        ));
        assert!(bus.read_point("C1").await.is_ok());

        bus.set_offline("F1", false);
        assert!(bus.read_point("F1").await.is_ok());

        bus.set_bus_offline(true);
        assert!(bus.read_point("C1").await.is_err());
    }

    #[tokio::test]
    async fn rejected_write_not_recorded() {
        let bus = bus();
        bus.reject_writes("C1", true);
        assert!(matches!(
            bus.write_point("C1", PointState::ON).await,
            Err(IoError::Rejected { .. })
        ));
        assert_eq!(bus.value("C1"), Some(0));
        assert!(bus.writes().is_empty());
    }

    #[tokio::test]
    async fn raw_values_pass_through() {
        let bus = bus();
        assert!(bus.set_raw("F1", 42));
        assert_eq!(bus.read_point("F1").await.unwrap().state, 42);
        assert!(!bus.set_raw("X", 1));
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_answer() {
        let bus = bus();
        bus.set_response_latency(Duration::from_millis(500));
        let started = Instant::now();
        bus.read_point("C1").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
