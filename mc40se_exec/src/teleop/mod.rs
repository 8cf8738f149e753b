//! Teleoperation module
//!
//! Manual driving from a gamepad. Each cycle the current [`GamepadState`] and the limit switch
//! inputs are turned into a [`DriveDemand`] for locomotion and a demand for each of the two
//! external driver channels.
//!
//! The module waits for the controller to connect and START to be pressed before driving, and
//! stops driving when SELECT is pressed.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use params::*;
pub use state::*;

use crate::ext_drv::ExtDrive;
use crate::loco_ctrl::{DriveDemand, Motion};
use hw_if::{Duty, GamepadState};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of external driver channels driven from the shoulder buttons.
pub const NUM_TELEOP_EXT_CHANNELS: usize = 2;

/// Number of limit switch inputs, two per external channel.
pub const NUM_LIMITS: usize = 2 * NUM_TELEOP_EXT_CHANNELS;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during Teleop operation.
#[derive(Debug, thiserror::Error)]
pub enum TeleopError {
    #[error("Could not load the teleop parameters: {0}")]
    ParamLoad(#[from] util::params::LoadError),

    #[error("Invalid teleop parameters: {0}")]
    InvalidParams(String),

    #[error("Could not open the teleop archive: {0}")]
    Archive(#[from] util::archive::ArchiveError),
}

/// Where the teleoperation session is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeleopPhase {
    /// Waiting for the controller to report as connected
    WaitConnect,

    /// Connected, waiting for START
    WaitStart,

    /// Driving from the controller until SELECT is pressed
    Active,

    /// SELECT pressed, waiting for it to be released
    WaitSelectRelease,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map the controller to a drive demand. The first matching rule wins:
///
/// 1. UP (with SQUARE: forward with the left motor held, with CIRCLE: forward with the right motor
///    held, otherwise forward)
/// 2. DOWN: reverse
/// 3. SQUARE: pivot left
/// 4. CIRCLE: pivot right
/// 5. Left stick up (with left: forward, left motor held, with right: forward, right motor held)
/// 6. Left stick down (with left: reverse, left motor held, with right: reverse, right motor held)
/// 7. Left stick left: pivot left
/// 8. Left stick right: pivot right
/// 9. Otherwise stop
///
/// Stick axes only count when deflected beyond `deadband`, the same threshold on every axis.
/// Earlier firmware applied a threshold of 10 to stick up (and to left while up) but treated any
/// non-zero deflection of down, right or a pivot as active, so a resting stick with a little
/// noise could creep into reverse or a pivot. Here a small deflection in any direction is ignored.
pub fn map_drive(pad: &GamepadState, speed: Duty, deadband: u8) -> DriveDemand {
    let held = |motion, left_held: bool, right_held: bool| DriveDemand::Drive {
        motion,
        left: if left_held { Duty::ZERO } else { speed },
        right: if right_held { Duty::ZERO } else { speed },
    };

    let stick_up = pad.joy_left_up > deadband;
    let stick_down = pad.joy_left_down > deadband;
    let stick_left = pad.joy_left_left > deadband;
    let stick_right = pad.joy_left_right > deadband;

    if pad.up {
        held(Motion::Forward, pad.square, !pad.square && pad.circle)
    } else if pad.down {
        held(Motion::Reverse, false, false)
    } else if pad.square {
        held(Motion::PivotLeft, false, false)
    } else if pad.circle {
        held(Motion::PivotRight, false, false)
    } else if stick_up {
        held(Motion::Forward, stick_left, !stick_left && stick_right)
    } else if stick_down {
        held(Motion::Reverse, stick_left, !stick_left && stick_right)
    } else if stick_left {
        held(Motion::PivotLeft, false, false)
    } else if stick_right {
        held(Motion::PivotRight, false, false)
    } else {
        DriveDemand::Stop
    }
}

/// Map the shoulder buttons to the external driver channels.
///
/// R1/R2 drive channel 1 clockwise/counter-clockwise, L1/L2 drive channel 2. A direction is only
/// driven while its limit switch is clear, `limits[i]` is `true` once limit `i + 1` is reached.
pub fn map_ext(
    pad: &GamepadState,
    limits: &[bool; NUM_LIMITS],
) -> [ExtDrive; NUM_TELEOP_EXT_CHANNELS] {
    let channel = |cw: bool, cw_limit: bool, ccw: bool, ccw_limit: bool| {
        if cw && !cw_limit {
            ExtDrive::Clockwise
        } else if ccw && !ccw_limit {
            ExtDrive::CounterClockwise
        } else {
            ExtDrive::Off
        }
    };

    [
        channel(pad.r1, limits[0], pad.r2, limits[1]),
        channel(pad.l1, limits[2], pad.l2, limits[3]),
    ]
}

/// Adjust the speed from the right stick.
///
/// Up beyond the threshold raises the speed by one step, down lowers it, staying within the
/// parameter range.
pub fn adjust_speed(pad: &GamepadState, speed: u16, params: &Params) -> u16 {
    if pad.joy_right_up > params.speed_joy_threshold {
        if speed < params.max_speed {
            return speed.saturating_add(params.speed_step).min(params.max_speed);
        }
    } else if pad.joy_right_down > params.speed_joy_threshold && speed > params.min_speed {
        return speed.saturating_sub(params.speed_step).max(params.min_speed);
    }

    speed
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
