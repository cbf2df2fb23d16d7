//! Interlock gating of starts and moves.

use barn_common::config::{ControlConfig, InterlockRule};
use barn_common::equipment::config::EquipmentConfig;
use barn_common::equipment::event::EquipmentEvent;
use barn_control::Directory;
use barn_control::interlock::{InterlockClient, InterlockError, RuleInterlocks};
use barn_hal::SimulatedFieldBus;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::common::{Plant, actual_on, polls, settle};

#[derive(Default)]
struct Erroring {
    calls: AtomicU32,
}

impl InterlockClient for Erroring {
    async fn can_start(&self, _name: &str) -> Result<bool, InterlockError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(InterlockError::Unavailable("safety PLC offline".to_string()))
    }
}

struct Hanging;

impl InterlockClient for Hanging {
    async fn can_start(&self, _name: &str) -> Result<bool, InterlockError> {
        std::future::pending::<()>().await;
        Ok(false)
    }
}

fn plant_with<I: InterlockClient>(interlocks: Arc<I>) -> Plant<SimulatedFieldBus, I> {
    Plant::build(
        Arc::new(SimulatedFieldBus::new().with_point("C1", 0)),
        interlocks,
        Directory::new(),
        ControlConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn erroring_interlock_fails_open() {
    let interlocks = Arc::new(Erroring::default());
    let plant = plant_with(Arc::clone(&interlocks));
    plant.start(EquipmentConfig::binary("fan", "C1"));
    settle().await;

    plant.directory.turn_on("fan").unwrap();
    settle().await;
    assert!(interlocks.calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(plant.bus.value("C1"), Some(1));
    assert!(!plant.status("fan").interlocked);
}

#[tokio::test(start_paused = true)]
async fn hanging_interlock_fails_open_after_timeout() {
    let plant = plant_with(Arc::new(Hanging));
    plant.start(EquipmentConfig::binary("fan", "C1"));
    settle().await;

    plant.directory.turn_on("fan").unwrap();
    tokio::time::sleep(ControlConfig::default().interlock_timeout() * 2).await;
    assert_eq!(plant.bus.value("C1"), Some(1));
    assert!(actual_on(&plant.status("fan")));
}

#[tokio::test(start_paused = true)]
async fn rule_blocks_until_dependency_runs() {
    let bus = Arc::new(
        SimulatedFieldBus::new()
            .with_point("FAN", 0)
            .with_point("CONV", 0),
    );
    let directory = Directory::new();
    let rules = [InterlockRule {
        equipment: "conveyor".to_string(),
        requires_running: vec!["fan".to_string()],
        requires_stopped: vec![],
    }];
    let interlocks = Arc::new(RuleInterlocks::new(&rules, directory.clone()));
    let plant = Plant::build(bus, interlocks, directory, ControlConfig::default());
    plant.start(EquipmentConfig::binary("fan", "FAN"));
    plant.start(EquipmentConfig::binary("conveyor", "CONV"));
    settle().await;

    plant.directory.turn_on("conveyor").unwrap();
    settle().await;
    assert!(plant.bus.writes_to("CONV").is_empty());
    assert!(plant.status("conveyor").interlocked);
    assert!(plant.events.events_for("conveyor").iter().any(|e| matches!(
        e,
        EquipmentEvent::InterlockBlocked { .. }
    )));

    plant.directory.turn_on("fan").unwrap();
    settle().await;
    assert!(plant.status("fan").is_running);

    plant.directory.turn_on("conveyor").unwrap();
    settle().await;
    assert_eq!(plant.bus.writes_to("CONV"), vec![1]);
    assert!(!plant.status("conveyor").interlocked);
}

#[tokio::test(start_paused = true)]
async fn interlocked_flag_clears_when_dependency_starts() {
    let bus = Arc::new(
        SimulatedFieldBus::new()
            .with_point("FAN", 0)
            .with_point("CONV", 0),
    );
    let directory = Directory::new();
    let rules = [InterlockRule {
        equipment: "conveyor".to_string(),
        requires_running: vec!["fan".to_string()],
        requires_stopped: vec![],
    }];
    let interlocks = Arc::new(RuleInterlocks::new(&rules, directory.clone()));
    let plant = Plant::build(bus, interlocks, directory, ControlConfig::default());
    plant.start(EquipmentConfig::binary("fan", "FAN"));
    plant.start(EquipmentConfig::binary("conveyor", "CONV"));
    settle().await;

    plant.directory.turn_on("conveyor").unwrap();
    settle().await;
    polls(1).await;
    assert!(plant.status("conveyor").interlocked);

    // No new command for the conveyor: the next poll notices the fan.
    plant.directory.turn_on("fan").unwrap();
    settle().await;
    polls(1).await;
    let conveyor = plant.status("conveyor");
    assert!(!conveyor.interlocked);
    assert!(!actual_on(&conveyor));
    assert!(plant.bus.writes_to("CONV").is_empty());
}

#[tokio::test(start_paused = true)]
async fn rule_on_missing_equipment_fails_open() {
    let directory = Directory::new();
    let rules = [InterlockRule {
        equipment: "fan".to_string(),
        requires_running: vec![],
        requires_stopped: vec!["heater".to_string()],
    }];
    let interlocks = Arc::new(RuleInterlocks::new(&rules, directory.clone()));
    let plant = Plant::build(
        Arc::new(SimulatedFieldBus::new().with_point("C1", 0)),
        interlocks,
        directory,
        ControlConfig::default(),
    );
    plant.start(EquipmentConfig::binary("fan", "C1"));
    settle().await;

    plant.directory.turn_on("fan").unwrap();
    settle().await;
    assert_eq!(plant.bus.value("C1"), Some(1));
}
