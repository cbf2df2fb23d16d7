//! Field I/O gateway implementations.
//!
//! - [`simulation`] - In-memory field bus for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `FieldIo` from `barn_common::io::gateway`
//! 3. Add its name to [`BUILTIN_DRIVERS`] and a constructor to the caller

pub mod simulation;

use barn_common::equipment::config::EquipmentConfig;
use barn_common::hal::config::SimBusConfig;
use barn_common::io::role::PointRole;
use thiserror::Error;
use tracing::{info, warn};

use self::simulation::SimulatedFieldBus;

/// Name of the bundled simulation driver.
pub const SIMULATION_DRIVER: &str = "simulation";

/// Every driver this crate can build.
pub const BUILTIN_DRIVERS: &[&str] = &[SIMULATION_DRIVER];

/// Error type for driver selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No driver with this name is bundled.
    #[error("driver not found: '{0}' (available: {available})", available = BUILTIN_DRIVERS.join(", "))]
    NotFound(String),
}

/// Build the named driver.
///
/// The simulation driver starts from `io` when given. Points referenced by
/// equipment but missing from the table are created so the control loop
/// can run against an incomplete `io.toml`: mode points start in auto
/// (`1`), everything else de-energized.
///
/// # Errors
///
/// Returns `DriverError::NotFound` for an unknown driver name.
pub fn create_driver(
    name: &str,
    io: Option<&SimBusConfig>,
    equipment: &[EquipmentConfig],
) -> Result<SimulatedFieldBus, DriverError> {
    if name != SIMULATION_DRIVER {
        return Err(DriverError::NotFound(name.to_string()));
    }

    let bus = match io {
        Some(config) => SimulatedFieldBus::from_config(config),
        None => SimulatedFieldBus::new(),
    };

    let mut created = 0usize;
    for eq in equipment {
        for (role, point) in eq.points.iter() {
            let initial = i64::from(role == PointRole::AutoManual);
            if bus.ensure_point(point, initial) {
                created += 1;
                if io.is_some() {
                    warn!(equipment = %eq.name, "Point '{}' ({}) missing from io table, simulating", point, role);
                }
            }
        }
    }

    info!(
        "Simulation driver ready: {} points ({} auto-created)",
        bus.point_count(),
        created
    );
    Ok(bus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use barn_common::hal::config::SimPointConfig;

    #[test]
    fn unknown_driver_rejected() {
        let err = create_driver("ethercat", None, &[]).unwrap_err();
        assert_eq!(err, DriverError::NotFound("ethercat".to_string()));
        assert!(err.to_string().contains("simulation"));
    }

    #[tokio::test]
    async fn missing_points_are_created() {
        let fan = EquipmentConfig::binary("fan", "C1")
            .with_point(PointRole::AutoManual, "AM")
            .with_point(PointRole::RunningFeedback, "F1");
        let io = SimBusConfig {
            point: vec![SimPointConfig {
                name: "C1".to_string(),
                initial: 1,
                linked: vec![],
            }],
        };

        let bus = create_driver(SIMULATION_DRIVER, Some(&io), &[fan]).unwrap();
        assert_eq!(bus.point_count(), 3);
        assert_eq!(bus.value("C1"), Some(1));
        assert_eq!(bus.value("AM"), Some(1));
        assert_eq!(bus.value("F1"), Some(0));
    }
}
