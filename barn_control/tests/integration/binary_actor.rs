//! Binary equipment driven through the directory.

use barn_common::equipment::config::EquipmentConfig;
use barn_common::equipment::error::ErrorKind;
use barn_common::equipment::event::{EquipmentEvent, TriggeredBy};
use barn_common::equipment::state::Mode;
use barn_common::io::role::PointRole;
use barn_control::ControlError;
use barn_hal::SimulatedFieldBus;

use super::common::{Plant, actual_on, commanded_on, polls, settle};

fn fan(name: &str, coil: &str, feedback: &str) -> EquipmentConfig {
    EquipmentConfig::binary(name, coil).with_point(PointRole::RunningFeedback, feedback)
}

#[tokio::test(start_paused = true)]
async fn stuck_feedback_surfaces_on_third_poll_and_clears() {
    let plant = Plant::new(SimulatedFieldBus::new().with_point("C1", 1).with_point("F1", 0));
    plant.start(fan("fan", "C1", "F1"));

    let mut seen = Vec::new();
    settle().await;
    seen.push(plant.status("fan").error);
    for _ in 0..2 {
        polls(1).await;
        seen.push(plant.status("fan").error);
    }
    assert_eq!(seen, vec![None, None, Some(ErrorKind::OnButNotRunning)]);
    assert_eq!(
        plant.status("fan").error_message.as_deref(),
        Some("Commanded on but not running")
    );

    plant.bus.set_raw("F1", 1);
    polls(1).await;
    assert_eq!(plant.status("fan").error, None);
    assert!(plant.status("fan").is_running);

    let errors: Vec<_> = plant
        .events
        .events_for("fan")
        .into_iter()
        .filter(|e| matches!(e, EquipmentEvent::ErrorChanged { .. }))
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[1].is_recovery());
}

#[tokio::test(start_paused = true)]
async fn inverted_coil_round_trip() {
    let mut config = EquipmentConfig::binary("siren", "C1");
    config.inverted = true;
    let plant = Plant::new(SimulatedFieldBus::new().with_point("C1", 1));
    plant.start(config);
    settle().await;
    assert!(!actual_on(&plant.status("siren")));

    for on in [true, false, true] {
        if on {
            plant.directory.turn_on("siren").unwrap();
        } else {
            plant.directory.turn_off("siren").unwrap();
        }
        settle().await;
        let status = plant.status("siren");
        assert_eq!(actual_on(&status), on);
        assert_eq!(plant.bus.value("C1"), Some(i64::from(!on)));
        assert_eq!(status.inverted, Some(true));
    }
}

#[tokio::test(start_paused = true)]
async fn physical_manual_ignores_commands_but_reports_hardware() {
    let config = fan("fan", "C1", "F1").with_point(PointRole::AutoManual, "AM");
    let plant = Plant::new(
        SimulatedFieldBus::new()
            .with_point("C1", 0)
            .with_point("F1", 0)
            .with_point("AM", 0),
    );
    plant.start(config);
    settle().await;
    assert_eq!(plant.status("fan").mode, Mode::Manual);

    plant.directory.turn_on("fan").unwrap();
    settle().await;
    assert!(plant.bus.writes().is_empty());
    assert!(!commanded_on(&plant.status("fan")));

    // The operator starts it at the panel.
    plant.bus.set_raw("C1", 1);
    plant.bus.set_raw("F1", 1);
    polls(1).await;
    let status = plant.status("fan");
    assert!(actual_on(&status));
    assert!(status.is_running);
    assert!(!commanded_on(&status));
    assert_eq!(status.is_auto_manual_virtual, Some(false));

    plant.directory.turn_off("fan").unwrap();
    settle().await;
    assert!(plant.bus.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn mismatch_only_reported_in_auto() {
    let plant = Plant::new(
        SimulatedFieldBus::new()
            .with_point("CA", 1)
            .with_point("FA", 0)
            .with_point("MA", 1)
            .with_point("CM", 1)
            .with_point("FM", 0)
            .with_point("MM", 0),
    );
    plant.start(fan("auto_fan", "CA", "FA").with_point(PointRole::AutoManual, "MA"));
    plant.start(fan("panel_fan", "CM", "FM").with_point(PointRole::AutoManual, "MM"));

    settle().await;
    polls(2).await;
    assert_eq!(plant.status("auto_fan").error, Some(ErrorKind::OnButNotRunning));
    assert_eq!(plant.status("panel_fan").error, None);
}

#[tokio::test(start_paused = true)]
async fn panel_returning_to_auto_switches_off() {
    let config = fan("fan", "C1", "F1").with_point(PointRole::AutoManual, "AM");
    let plant = Plant::new(
        SimulatedFieldBus::new()
            .with_point("C1", 1)
            .with_point("F1", 1)
            .with_point("AM", 0),
    );
    plant.start(config);
    settle().await;

    plant.bus.set_raw("AM", 1);
    polls(1).await;
    assert_eq!(plant.bus.writes_to("C1"), vec![0]);
    let status = plant.status("fan");
    assert_eq!(status.mode, Mode::Auto);
    assert!(!commanded_on(&status));

    // One off-write only, even across further cycles.
    polls(2).await;
    assert_eq!(plant.bus.writes_to("C1"), vec![0]);
    assert!(plant.events.events_for("fan").iter().any(|e| matches!(
        e,
        EquipmentEvent::ModeChanged {
            triggered_by: TriggeredBy::Panel,
            to: Mode::Auto,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn bus_outage_reports_timeout_then_recovers() {
    let plant = Plant::new(SimulatedFieldBus::new().with_point("C1", 1).with_point("F1", 1));
    plant.start(fan("pump", "C1", "F1"));
    settle().await;

    plant.bus.set_bus_offline(true);
    polls(1).await;
    let status = plant.status("pump");
    assert_eq!(status.error, Some(ErrorKind::Timeout));
    assert!(!status.is_running);

    plant.bus.set_bus_offline(false);
    polls(1).await;
    let status = plant.status("pump");
    assert_eq!(status.error, None);
    assert!(actual_on(&status) && status.is_running);
    assert!(plant.bus.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn virtual_mode_switch_from_software() {
    let mut config = EquipmentConfig::binary("light", "C1").with_point(PointRole::AutoManual, "V");
    config.auto_manual_virtual = true;
    let plant = Plant::new(SimulatedFieldBus::new().with_point("C1", 0).with_point("V", 1));
    plant.start(config);
    settle().await;

    plant.directory.set_mode("light", Mode::Manual).unwrap();
    plant.directory.turn_on("light").unwrap();
    settle().await;
    let status = plant.status("light");
    assert_eq!(status.mode, Mode::Manual);
    assert_eq!(status.is_auto_manual_virtual, Some(true));
    assert!(actual_on(&status));

    plant.directory.set_mode("light", Mode::Auto).unwrap();
    settle().await;
    assert_eq!(plant.bus.value("C1"), Some(0));
    assert_eq!(plant.bus.value("V"), Some(1));
}

#[tokio::test(start_paused = true)]
async fn positional_commands_rejected() {
    let plant = Plant::new(SimulatedFieldBus::new().with_point("C1", 0));
    plant.start(EquipmentConfig::binary("fan", "C1"));
    assert!(matches!(
        plant.directory.stop_movement("fan"),
        Err(ControlError::UnsupportedCommand { .. })
    ));
    assert_eq!(
        plant.directory.turn_on("pump"),
        Err(ControlError::UnknownEquipment("pump".to_string()))
    );
}
