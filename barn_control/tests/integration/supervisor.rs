//! Supervision: startup validation, crash recovery, restart limits.

use barn_common::config::ControlConfig;
use barn_common::equipment::config::EquipmentConfig;
use barn_common::equipment::error::ErrorKind;
use barn_common::io::gateway::{FieldIo, IoError, PointState};
use barn_common::io::role::PointRole;
use barn_control::interlock::NoInterlocks;
use barn_control::{ControlError, Directory};
use barn_hal::SimulatedFieldBus;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::common::{Plant, actual_on, commanded_on, polls, settle};

/// Simulated bus whose next read panics while armed.
struct FaultyDriver {
    bus: SimulatedFieldBus,
    armed: AtomicBool,
    /// Keep panicking instead of disarming after one fault.
    sticky: bool,
}

impl FaultyDriver {
    fn new(bus: SimulatedFieldBus, sticky: bool) -> Self {
        Self {
            bus,
            armed: AtomicBool::new(false),
            sticky,
        }
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl FieldIo for FaultyDriver {
    async fn read_point(&self, name: &str) -> Result<PointState, IoError> {
        let armed = if self.sticky {
            self.armed.load(Ordering::SeqCst)
        } else {
            self.armed.swap(false, Ordering::SeqCst)
        };
        if armed {
            panic!("driver fault reading {name}");
        }
        self.bus.read_point(name).await
    }

    async fn write_point(&self, name: &str, value: PointState) -> Result<(), IoError> {
        self.bus.write_point(name, value).await
    }
}

fn faulty_plant(sticky: bool, control: ControlConfig) -> Plant<FaultyDriver, NoInterlocks> {
    let bus = SimulatedFieldBus::new().with_point("C1", 1).with_point("F1", 1);
    Plant::build(
        Arc::new(FaultyDriver::new(bus, sticky)),
        Arc::new(NoInterlocks),
        Directory::new(),
        control,
    )
}

fn fan() -> EquipmentConfig {
    EquipmentConfig::binary("fan", "C1").with_point(PointRole::RunningFeedback, "F1")
}

#[tokio::test(start_paused = true)]
async fn panicking_actor_is_restarted_from_hardware() {
    let plant = faulty_plant(false, ControlConfig::default());
    plant.start(fan());
    settle().await;
    assert!(plant.status("fan").is_running);

    plant.bus.arm();
    polls(1).await;

    // Between the crash and the restart the equipment reads as crashed.
    assert_eq!(plant.status("fan").error, Some(ErrorKind::CrashedPreviously));
    assert_eq!(
        plant.directory.turn_off("fan"),
        Err(ControlError::ActorStopped("fan".to_string()))
    );

    tokio::time::sleep(ControlConfig::default().restart_delay()).await;
    settle().await;
    let status = plant.status("fan");
    assert_eq!(status.error, None);
    assert!(actual_on(&status) && status.is_running && commanded_on(&status));
    assert!(plant.bus.bus.writes().is_empty());
    assert_eq!(plant.supervisor.restart_count("fan"), 1);

    // The new actor answers commands.
    plant.directory.turn_off("fan").unwrap();
    settle().await;
    assert_eq!(plant.bus.bus.value("C1"), Some(0));
}

#[tokio::test(start_paused = true)]
async fn restarts_are_bounded() {
    let control = ControlConfig {
        max_restarts: 2,
        restart_delay_ms: 100,
        ..ControlConfig::default()
    };
    let plant = faulty_plant(true, control);
    plant.bus.arm();
    plant.start(fan());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(plant.supervisor.restart_count("fan"), 3);
    assert_eq!(
        plant.directory.lookup("fan").map(|h| h.name().to_string()),
        Err(ControlError::UnknownEquipment("fan".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn invalid_records_are_not_started() {
    let plant = Plant::new(SimulatedFieldBus::new().with_point("C1", 0));

    let mut no_coil = EquipmentConfig::binary("fan", "C1");
    no_coil.points.on_off_coil = None;
    assert!(matches!(
        plant.supervisor.ensure_started(no_coil),
        Err(ControlError::MissingPoint {
            role: PointRole::OnOffCoil,
            ..
        })
    ));

    let mut zero_poll = EquipmentConfig::binary("pump", "C1");
    zero_poll.poll_interval_ms = 0;
    assert!(matches!(
        plant.supervisor.ensure_started(zero_poll),
        Err(ControlError::InvalidConfig(_))
    ));

    let mut no_limit = EquipmentConfig::positional("feeder", "TF", "TB", "FL", "BL");
    no_limit.points.back_limit = None;
    let failures = plant
        .supervisor
        .start_all(&[EquipmentConfig::binary("light", "C1"), no_limit]);
    assert_eq!(failures.len(), 1);
    assert_eq!(plant.directory.names(), vec!["light".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn ensure_started_is_idempotent() {
    let plant = Plant::new(SimulatedFieldBus::new().with_point("C1", 0));
    let first = plant.supervisor.ensure_started(EquipmentConfig::binary("fan", "C1")).unwrap();
    let second = plant.supervisor.ensure_started(EquipmentConfig::binary("fan", "C1")).unwrap();
    assert_eq!(first.name(), second.name());
    assert_eq!(plant.directory.len(), 1);

    second.send(barn_control::Command::TurnOn).unwrap();
    settle().await;
    assert_eq!(plant.bus.writes_to("C1"), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_every_actor() {
    let plant = Plant::new(SimulatedFieldBus::new().with_point("C1", 0).with_point("C2", 0));
    plant.start(EquipmentConfig::binary("fan", "C1"));
    plant.start(EquipmentConfig::binary("light", "C2"));
    settle().await;
    let handle = plant.directory.lookup("fan").unwrap();

    plant.supervisor.shutdown().await;
    assert!(plant.directory.is_empty());
    assert!(!handle.is_alive());
    assert_eq!(handle.status().error, Some(ErrorKind::CrashedPreviously));
}
