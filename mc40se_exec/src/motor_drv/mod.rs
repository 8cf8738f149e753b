//! # Motor driver module
//!
//! This module provides a unified motor control interface over the two driver types the board
//! supports: ESC-style brushless controllers and H-bridge brush driver modules. Both take a run
//! line, a direction line and a PWM duty per port, but interpret the two lines differently, see
//! [`brushless`] and [`brush`] for the exact signal tables.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`MotorDriver`] implementation for ESC-style brushless controllers.
pub mod brushless;

/// [`MotorDriver`] implementation for H-bridge brush driver modules.
pub mod brush;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use hw_if::{Direction, DriverOutputState, Duty, LineError, MotorCommand, MotorPort, MotorStatus};

pub use brush::BrushDriver;
pub use brushless::BrushlessDriver;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Low phase of the brushless fault-reset pulse.
pub const BL_RESET_LOW_MS: u16 = 5;

/// High phase of the brushless fault-reset pulse.
pub const BL_RESET_HIGH_MS: u16 = 10;

pub(crate) const RUN_LINES: [&str; 2] = ["RUN1", "RUN2"];
pub(crate) const DIR_LINES: [&str; 2] = ["DIR1", "DIR2"];

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for the board's motor drivers.
///
/// The trait is object safe so that the driver type may be chosen from configuration.
pub trait MotorDriver {
    /// The type of driver behind this implementation.
    fn kind(&self) -> DriveKind;

    /// Apply a full command to a port: run/brake and direction lines, then the duty.
    ///
    /// The duty is written whatever the status, so a brake with a non-zero speed leaves the duty
    /// register populated but inert.
    fn command(&mut self, port: MotorPort, cmd: MotorCommand) -> Result<(), MotorDrvError> {
        self.drive(port, cmd.status, cmd.direction)?;
        self.set_duty(port, cmd.speed)
    }

    /// Set the run/brake and direction lines of a port without touching its duty.
    fn drive(
        &mut self,
        port: MotorPort,
        status: MotorStatus,
        direction: Direction,
    ) -> Result<(), MotorDrvError>;

    /// Write the duty of a port without touching its lines.
    fn set_duty(&mut self, port: MotorPort, duty: Duty) -> Result<(), MotorDrvError>;

    /// Brake both ports. Duties are left as they are.
    fn brake_all(&mut self) -> Result<(), MotorDrvError>;

    /// The lines and duty last written to a port.
    fn output_state(&self, port: MotorPort) -> DriverOutputState;

    /// Bring both ports to their power-up safe state.
    fn init(&mut self) -> Result<(), MotorDrvError>;
}

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The hardware lines serving one motor port.
pub struct PortLines<P, W> {
    /// Run/brake line
    pub run: P,

    /// Direction line
    pub dir: P,

    /// PWM duty channel
    pub pwm: W,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// The type of motor driver fitted to the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveKind {
    Brushless,
    Brush,
}

#[derive(Debug, Error)]
pub enum MotorDrvError {
    #[error(transparent)]
    Line(#[from] LineError),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<P, W> PortLines<P, W> {
    pub fn new(run: P, dir: P, pwm: W) -> Self {
        Self { run, dir, pwm }
    }
}

impl fmt::Display for DriveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveKind::Brushless => write!(f, "brushless"),
            DriveKind::Brush => write!(f, "brush"),
        }
    }
}

impl<M: MotorDriver + ?Sized> MotorDriver for Box<M> {
    fn kind(&self) -> DriveKind {
        (**self).kind()
    }

    fn command(&mut self, port: MotorPort, cmd: MotorCommand) -> Result<(), MotorDrvError> {
        (**self).command(port, cmd)
    }

    fn drive(
        &mut self,
        port: MotorPort,
        status: MotorStatus,
        direction: Direction,
    ) -> Result<(), MotorDrvError> {
        (**self).drive(port, status, direction)
    }

    fn set_duty(&mut self, port: MotorPort, duty: Duty) -> Result<(), MotorDrvError> {
        (**self).set_duty(port, duty)
    }

    fn brake_all(&mut self) -> Result<(), MotorDrvError> {
        (**self).brake_all()
    }

    fn output_state(&self, port: MotorPort) -> DriverOutputState {
        (**self).output_state(port)
    }

    fn init(&mut self) -> Result<(), MotorDrvError> {
        (**self).init()
    }
}
