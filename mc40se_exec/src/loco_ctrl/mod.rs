//! Locomotion control module
//!
//! Differential drive over the two motor ports, port 1 driving the left motor and port 2 the right
//! one. Each motion maps to a pair of shaft directions which depends on the gearbox fitted, see
//! [`GearPolarity`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cmd::*;
pub use params::*;
pub use state::*;

use crate::motor_drv::{DriveKind, MotorDrvError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LocoCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum LocoCtrlError {
    #[error("Motor driver failure: {0}")]
    Driver(#[from] MotorDrvError),

    #[error("A speed was commanded before any direction, command a direction first")]
    NoActiveMotion,

    #[error("Parameters expect a {expected} driver but a {found} driver was provided")]
    DriveKindMismatch {
        expected: DriveKind,
        found: DriveKind,
    },
}
