//! Simulated field bus integration tests.
//!
//! Drives the bus through the `FieldIo` port the way the control engine does:
//! coil writes, delayed feedback, limit switches wired to travel coils.

use barn_common::hal::config::SimBusConfig;
use barn_common::io::gateway::{FieldIo, PointState};
use barn_hal::{SIMULATION_DRIVER, create_driver};
use std::time::Duration;

const FEEDER_IO: &str = r#"
[[point]]
name = "TF"

[[point.linked]]
trigger = true
delay_s = 3.0
point = "FL"
result = true

[[point.linked]]
trigger = true
delay_s = 0.0
point = "BL"
result = false

[[point]]
name = "TB"

[[point]]
name = "FL"

[[point]]
name = "BL"
initial = 1
"#;

fn feeder_bus() -> barn_hal::SimulatedFieldBus {
    let config: SimBusConfig = toml::from_str(FEEDER_IO).unwrap();
    config.validate().unwrap();
    create_driver(SIMULATION_DRIVER, Some(&config), &[]).unwrap()
}

#[tokio::test(start_paused = true)]
async fn front_limit_reached_after_travel_time() {
    let bus = feeder_bus();
    assert_eq!(bus.read_point("BL").await.unwrap(), PointState::ON);

    bus.write_point("TF", PointState::ON).await.unwrap();
    assert_eq!(bus.read_point("BL").await.unwrap(), PointState::OFF);
    assert_eq!(bus.read_point("FL").await.unwrap(), PointState::OFF);

    tokio::time::advance(Duration::from_secs(3)).await;
    assert_eq!(bus.read_point("FL").await.unwrap(), PointState::ON);
}

#[tokio::test(start_paused = true)]
async fn write_log_keeps_order() {
    let bus = feeder_bus();
    bus.write_point("TB", PointState::OFF).await.unwrap();
    bus.write_point("TF", PointState::ON).await.unwrap();
    bus.write_point("TF", PointState::OFF).await.unwrap();

    let log: Vec<_> = bus
        .writes()
        .into_iter()
        .map(|w| (w.point, w.value))
        .collect();
    assert_eq!(
        log,
        vec![
            ("TB".to_string(), 0),
            ("TF".to_string(), 1),
            ("TF".to_string(), 0),
        ]
    );

    bus.clear_writes();
    assert!(bus.writes().is_empty());
}
