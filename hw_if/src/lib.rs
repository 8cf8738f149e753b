//! # Hardware interface crate.
//!
//! Provides the data model shared by everything that talks to the MC40SE board, and the hardware
//! seams (digital lines, PWM channels, the relay data bus, delays and the gamepad receiver) that
//! the actuation layer is written against.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Motor channel identification and command types
pub mod motor;

/// Relay and external driver channel addressing
pub mod relay;

/// Output line and parallel bus abstractions
pub mod line;

/// Gamepad receiver snapshot
pub mod gamepad;

/// Recording mock hardware driven by a virtual clock
pub mod sim;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use embedded_hal;

pub use gamepad::{Gamepad, GamepadState};
pub use line::{LineError, LineExt, ParallelBus};
pub use motor::{
    Direction, DriverOutputState, Duty, DutyError, MotorCommand, MotorPort, MotorStatus,
};
pub use relay::{ExtChannel, RelayIndex, RelayIndexError};
