//! Shared harness: a supervised plant on a simulated bus.

use barn_common::config::ControlConfig;
use barn_common::equipment::config::EquipmentConfig;
use barn_common::equipment::status::{EquipmentStatus, StatusDetail};
use barn_common::io::gateway::FieldIo;
use barn_control::events::MemoryEventLog;
use barn_control::interlock::{InterlockClient, NoInterlocks};
use barn_control::{Directory, Supervisor};
use barn_hal::SimulatedFieldBus;
use std::sync::Arc;
use std::time::Duration;

/// Default poll period of test equipment.
pub const POLL: Duration = Duration::from_millis(1000);

pub struct Plant<G, I> {
    pub bus: Arc<G>,
    pub events: Arc<MemoryEventLog>,
    pub directory: Directory,
    pub supervisor: Supervisor<G, I, MemoryEventLog>,
}

impl Plant<SimulatedFieldBus, NoInterlocks> {
    pub fn new(bus: SimulatedFieldBus) -> Self {
        Plant::build(Arc::new(bus), Arc::new(NoInterlocks), Directory::new(), ControlConfig::default())
    }
}

impl<G: FieldIo, I: InterlockClient> Plant<G, I> {
    pub fn build(bus: Arc<G>, interlocks: Arc<I>, directory: Directory, control: ControlConfig) -> Self {
        let events = Arc::new(MemoryEventLog::new());
        let supervisor = Supervisor::new(
            Arc::clone(&bus),
            interlocks,
            Arc::clone(&events),
            control,
            directory.clone(),
        );
        Self {
            bus,
            events,
            directory,
            supervisor,
        }
    }

    pub fn start(&self, config: EquipmentConfig) {
        self.supervisor.ensure_started(config).unwrap();
    }

    pub fn status(&self, name: &str) -> EquipmentStatus {
        self.directory.status(name).unwrap()
    }
}

/// Let spawned actors process pending work without crossing a poll.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Advance virtual time by `n` poll periods.
pub async fn polls(n: u32) {
    tokio::time::sleep(POLL * n).await;
}

pub fn actual_on(status: &EquipmentStatus) -> bool {
    match status.detail {
        StatusDetail::Binary { actual_on, .. } => actual_on,
        StatusDetail::Positional { .. } => panic!("{} is not binary", status.name),
    }
}

pub fn commanded_on(status: &EquipmentStatus) -> bool {
    match status.detail {
        StatusDetail::Binary { commanded_on, .. } => commanded_on,
        StatusDetail::Positional { .. } => panic!("{} is not binary", status.name),
    }
}
