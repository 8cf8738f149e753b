//! # Gamepad receiver interface
//!
//! The gamepad receiver module decodes a PS2-style controller and reports buttons and analog stick
//! deflections. The protocol decoding itself lives behind the [`Gamepad`] trait, this module only
//! defines the decoded snapshot.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest value reported for a stick axis deflection.
pub const MAX_AXIS: u8 = 100;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of decoded gamepad snapshots.
pub trait Gamepad {
    type Error;

    /// Poll the receiver for the current controller state.
    fn read(&mut self) -> Result<GamepadState, Self::Error>;
}

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Decoded controller state.
///
/// Buttons are `true` while pressed. Stick axes report the deflection towards each direction in
/// `0..=100`, one value per half axis, so an untouched stick reads zero everywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadState {
    /// The controller is connected and reporting
    pub connected: bool,

    pub select: bool,
    pub start: bool,

    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,

    pub triangle: bool,
    pub circle: bool,
    pub cross: bool,
    pub square: bool,

    pub l1: bool,
    pub l2: bool,
    pub r1: bool,
    pub r2: bool,

    pub joy_left_up: u8,
    pub joy_left_down: u8,
    pub joy_left_left: u8,
    pub joy_left_right: u8,

    pub joy_right_up: u8,
    pub joy_right_down: u8,
    pub joy_right_left: u8,
    pub joy_right_right: u8,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl GamepadState {
    /// A connected controller with nothing pressed.
    pub fn idle() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// Clamp all axes to [`MAX_AXIS`].
    pub fn clamped(mut self) -> Self {
        for axis in [
            &mut self.joy_left_up,
            &mut self.joy_left_down,
            &mut self.joy_left_left,
            &mut self.joy_left_right,
            &mut self.joy_right_up,
            &mut self.joy_right_down,
            &mut self.joy_right_left,
            &mut self.joy_right_right,
        ]
        .iter_mut()
        {
            **axis = (**axis).min(MAX_AXIS);
        }

        self
    }
}
