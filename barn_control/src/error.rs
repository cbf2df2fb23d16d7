//! Control engine error type.
//!
//! These are errors of the engine's API (configuration, addressing,
//! mailboxes). Equipment faults are not errors here: they are
//! [`ErrorKind`](barn_common::equipment::error::ErrorKind) values carried in
//! the equipment state.

use barn_common::config::ConfigError;
use barn_common::io::role::PointRole;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// A point required by the equipment kind is not bound.
    #[error("equipment '{equipment}' is missing required point '{role}'")]
    MissingPoint { equipment: String, role: PointRole },

    /// The equipment record failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No actor is registered under this name.
    #[error("unknown equipment '{0}'")]
    UnknownEquipment(String),

    /// The command does not apply to this equipment kind.
    #[error("equipment '{equipment}' does not support {command}")]
    UnsupportedCommand {
        equipment: String,
        command: &'static str,
    },

    /// The actor's mailbox is full; the command was dropped.
    #[error("mailbox of '{0}' is full")]
    MailboxFull(String),

    /// The actor is not running (crashed or shut down).
    #[error("actor for '{0}' is not running")]
    ActorStopped(String),

    /// The supervisor gave up restarting this actor.
    #[error("equipment '{equipment}' exhausted {max} restarts")]
    RestartsExhausted { equipment: String, max: u32 },
}

impl From<ConfigError> for ControlError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}
