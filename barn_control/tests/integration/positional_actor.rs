//! Feeder travel cycles driven through the directory.

use barn_common::equipment::config::EquipmentConfig;
use barn_common::equipment::error::ErrorKind;
use barn_common::equipment::state::MoveTarget;
use barn_common::equipment::status::StatusDetail;
use barn_common::hal::config::LinkedPoint;
use barn_control::ControlError;
use barn_control::interlock::NoInterlocks;
use barn_hal::SimulatedFieldBus;
use std::time::Duration;

use super::common::{Plant, polls, settle};

fn link(point: &str, delay_s: f64, result: bool) -> LinkedPoint {
    LinkedPoint {
        trigger: true,
        delay_s,
        point: point.to_string(),
        result,
    }
}

/// Feeder parked at the back limit; a forward travel takes 5 s.
fn feeder_bus() -> SimulatedFieldBus {
    SimulatedFieldBus::new()
        .with_point("TF", 0)
        .with_point("TB", 0)
        .with_point("FL", 0)
        .with_point("BL", 1)
        .with_link("TF", link("BL", 0.5, false))
        .with_link("TF", link("FL", 5.0, true))
}

fn feeder() -> EquipmentConfig {
    EquipmentConfig::positional("feeder", "TF", "TB", "FL", "BL")
}

fn target(plant: &Plant<SimulatedFieldBus, NoInterlocks>) -> Option<MoveTarget> {
    match plant.status("feeder").detail {
        StatusDetail::Positional {
            commanded_target, ..
        } => commanded_target,
        StatusDetail::Binary { .. } => None,
    }
}

#[tokio::test(start_paused = true)]
async fn travel_to_front_stops_at_limit() {
    let plant = Plant::new(feeder_bus());
    plant.start(feeder());
    settle().await;

    plant.directory.move_to("feeder", MoveTarget::Front).unwrap();
    settle().await;
    assert_eq!(plant.bus.value("TF"), Some(1));
    assert_eq!(plant.bus.value("TB"), Some(0));
    assert_eq!(target(&plant), Some(MoveTarget::Front));
    assert!(plant.status("feeder").is_running);

    polls(6).await;
    let status = plant.status("feeder");
    assert_eq!(target(&plant), None);
    assert_eq!(plant.bus.value("TF"), Some(0));
    assert_eq!(plant.bus.value("TB"), Some(0));
    assert_eq!(status.error, None);
    assert!(matches!(
        status.detail,
        StatusDetail::Positional {
            at_front_limit: true,
            at_back_limit: false,
            front_coil_on: false,
            back_coil_on: false,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn stop_mid_travel() {
    let plant = Plant::new(feeder_bus());
    plant.start(feeder());
    settle().await;

    plant.directory.move_to("feeder", MoveTarget::Front).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    plant.directory.stop_movement("feeder").unwrap();
    settle().await;

    assert_eq!(target(&plant), None);
    assert_eq!(plant.bus.value("TF"), Some(0));

    // Parked between limits: no fault after the grace window.
    polls(4).await;
    assert_eq!(plant.status("feeder").error, None);
}

#[tokio::test(start_paused = true)]
async fn both_coils_energized_is_invalid_data() {
    let bus = SimulatedFieldBus::new()
        .with_point("TF", 1)
        .with_point("TB", 1)
        .with_point("FL", 0)
        .with_point("BL", 0);
    let plant = Plant::new(bus);
    plant.start(feeder());
    settle().await;

    assert_eq!(plant.status("feeder").error, Some(ErrorKind::InvalidData));
    assert_eq!(plant.bus.value("TF"), Some(0));
    assert_eq!(plant.bus.value("TB"), Some(0));
}

#[tokio::test(start_paused = true)]
async fn binary_commands_rejected() {
    let plant = Plant::new(feeder_bus());
    plant.start(feeder());
    assert!(matches!(
        plant.directory.turn_on("feeder"),
        Err(ControlError::UnsupportedCommand { .. })
    ));
}
