//! # MC40SE controller library.
//!
//! Actuation layer of the MC40SE motor controller board: everything that turns an intent (run or
//! brake a motor, drive forward, pivot, energize a relay) into the exact line levels, PWM duty
//! values and timings the board's drivers need.
//!
//! The layer is written against the [`hw_if`] seams, so it runs the same on real pins and on the
//! recording [`hw_if::sim`] hardware used by the tests and the executables.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Relay bank - latched 8-bit relay register
pub mod relay_bank;

/// Motor drivers - brushless ESC and brush H-bridge control protocols
pub mod motor_drv;

/// Locomotion control - differential drive primitives over the two motor ports
pub mod loco_ctrl;

/// External driver adapter - relay pairs used as direction selectors for off-board drivers
pub mod ext_drv;

/// Teleoperation - maps gamepad state to drive and external driver demands
pub mod teleop;

/// Diagnostics - actuation sequences used to check each output of the board
pub mod diag;

/// Board assembly on simulated hardware
pub mod board;

/// Hardware that fails on demand
#[cfg(test)]
mod faulty;
