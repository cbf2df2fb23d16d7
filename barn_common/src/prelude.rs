//! Prelude module for common re-exports.
//!
//! ```rust
//! use barn_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ControlConfig, FullConfig, InterlockRule, LogLevel, SharedConfig,
    load_config_dir,
};

// ─── Equipment ──────────────────────────────────────────────────────
pub use crate::equipment::config::{EquipmentConfig, EquipmentKind, PointMap};
pub use crate::equipment::error::{ErrorClass, ErrorKind};
pub use crate::equipment::event::{EquipmentEvent, Metadata, TriggeredBy};
pub use crate::equipment::state::{BinaryState, Mode, MoveTarget, PositionalState};
pub use crate::equipment::status::{EquipmentStatus, StatusDetail};

// ─── I/O ────────────────────────────────────────────────────────────
pub use crate::io::gateway::{FieldIo, IoError, PointState};
pub use crate::io::role::{PointDirection, PointRole};
