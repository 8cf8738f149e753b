//! Parameters structure for Teleop

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::TeleopError;
use hw_if::{gamepad::MAX_AXIS, motor::MAX_DUTY};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for teleoperation.
///
/// Speeds are duty values.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Speed on entering the active phase
    pub default_speed: u16,

    /// Change in speed per cycle while the right stick is held
    pub speed_step: u16,

    pub min_speed: u16,
    pub max_speed: u16,

    /// Left stick deflections up to this value are ignored
    pub joy_deadband: u8,

    /// Right stick deflection needed to change speed
    pub speed_joy_threshold: u8,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            default_speed: 300,
            speed_step: 5,
            min_speed: 5,
            max_speed: 1015,
            joy_deadband: 10,
            speed_joy_threshold: 30,
        }
    }
}

impl Params {
    /// Check the parameters are consistent.
    pub fn validate(&self) -> Result<(), TeleopError> {
        if self.max_speed > MAX_DUTY {
            return Err(TeleopError::InvalidParams(format!(
                "max_speed ({}) is above the maximum duty ({})",
                self.max_speed, MAX_DUTY
            )));
        }

        if self.min_speed > self.max_speed {
            return Err(TeleopError::InvalidParams(format!(
                "min_speed ({}) is above max_speed ({})",
                self.min_speed, self.max_speed
            )));
        }

        if self.default_speed < self.min_speed || self.default_speed > self.max_speed {
            return Err(TeleopError::InvalidParams(format!(
                "default_speed ({}) is outside {}..={}",
                self.default_speed, self.min_speed, self.max_speed
            )));
        }

        if self.joy_deadband >= MAX_AXIS || self.speed_joy_threshold >= MAX_AXIS {
            return Err(TeleopError::InvalidParams(format!(
                "stick thresholds must be below {}",
                MAX_AXIS
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
