//! # Motor channel and command types

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Highest duty value accepted by the 10-bit PWM modules.
pub const MAX_DUTY: u16 = 1023;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A PWM duty cycle value in the range `0..=1023`.
///
/// This is a duty value, not a physical speed. `0` gives no drive power, `1023` full duty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Duty(u16);

/// A transient command for one motor port.
///
/// Drivers hold no command history, only the live state of their output lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorCommand {
    /// Run or brake the motor
    pub status: MotorStatus,

    /// Direction of rotation
    pub direction: Direction,

    /// Duty written to the port's PWM register, whatever the status
    pub speed: Duty,
}

/// Snapshot of the lines a driver has written for one port.
///
/// `true` means the line is driven high.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverOutputState {
    pub run_line: bool,
    pub direction_line: bool,
    pub pwm_duty: u16,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// One of the two motor channels on the board.
///
/// In the locomotion layout `Port1` drives the left motor and `Port2` the right one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotorPort {
    Port1,
    Port2,
}

/// High level power state of a motor.
///
/// Brake is an active stop request to the driver, not a gentle deceleration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotorStatus {
    Run,
    Brake,
}

/// Direction of rotation of a motor shaft, seen from the output side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DutyError {
    #[error("Duty must be between 0 and {}, found {0}", MAX_DUTY)]
    OutOfRange(u16),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Duty {
    /// No drive power.
    pub const ZERO: Duty = Duty(0);

    /// Full duty.
    pub const MAX: Duty = Duty(MAX_DUTY);

    /// Create a new duty, rejecting values above [`MAX_DUTY`].
    pub fn new(value: u16) -> Result<Self, DutyError> {
        if value > MAX_DUTY {
            return Err(DutyError::OutOfRange(value));
        }

        Ok(Self(value))
    }

    /// Create a new duty, saturating values above [`MAX_DUTY`].
    pub fn saturating(value: u16) -> Self {
        Self(value.min(MAX_DUTY))
    }

    /// The raw register value.
    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Duty {
    type Error = DutyError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Duty::new(value)
    }
}

impl From<Duty> for u16 {
    fn from(duty: Duty) -> Self {
        duty.0
    }
}

impl fmt::Display for Duty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MotorCommand {
    /// Run in the given direction at the given duty.
    pub fn run(direction: Direction, speed: Duty) -> Self {
        Self {
            status: MotorStatus::Run,
            direction,
            speed,
        }
    }

    /// Brake, leaving the direction line at `direction` and the duty register at zero.
    pub fn brake(direction: Direction) -> Self {
        Self {
            status: MotorStatus::Brake,
            direction,
            speed: Duty::ZERO,
        }
    }
}

impl MotorPort {
    /// Both ports, in board order.
    pub const ALL: [MotorPort; 2] = [MotorPort::Port1, MotorPort::Port2];

    /// Zero based index of the port, for indexing per-port arrays.
    pub fn index(self) -> usize {
        match self {
            MotorPort::Port1 => 0,
            MotorPort::Port2 => 1,
        }
    }

    /// The board's label number for the port (1 or 2).
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl fmt::Display for MotorPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PORT{}", self.number())
    }
}

impl Direction {
    /// Both directions.
    pub const ALL: [Direction; 2] = [Direction::Clockwise, Direction::CounterClockwise];

    /// The opposite direction.
    pub fn inverse(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}


// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duty_range() {
        assert_eq!(Duty::new(0), Ok(Duty::ZERO));
        assert_eq!(Duty::new(1023), Ok(Duty::MAX));
        assert_eq!(Duty::new(1024), Err(DutyError::OutOfRange(1024)));
        assert_eq!(Duty::saturating(5000), Duty::MAX);
        assert_eq!(Duty::try_from(500).map(u16::from), Ok(500));
    }

    #[test]
    fn test_direction_inverse() {
        for dir in Direction::ALL.iter() {
            assert_ne!(dir.inverse(), *dir);
            assert_eq!(dir.inverse().inverse(), *dir);
        }
    }

    #[test]
    fn test_port_numbering() {
        assert_eq!(MotorPort::Port1.number(), 1);
        assert_eq!(MotorPort::Port2.index(), 1);
        assert_eq!(format!("{}", MotorPort::Port2), "PORT2");
    }
}
