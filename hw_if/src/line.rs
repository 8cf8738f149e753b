//! # Output lines and the parallel data bus

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::digital::v2::OutputPin;
use std::fmt::Debug;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// An 8-bit parallel output port, written as a whole.
pub trait ParallelBus {
    type Error: Debug;

    /// Drive all eight data lines to the bits of `value`, bit 0 on line 0.
    fn write_byte(&mut self, value: u8) -> Result<(), Self::Error>;
}

/// Level helpers for [`OutputPin`]s that tag failures with the name of the line.
pub trait LineExt {
    /// Drive the line high (`true`) or low (`false`).
    fn drive(&mut self, high: bool, line: &'static str) -> Result<(), LineError>;
}

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A hardware line or bus could not be written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Failed to drive the {line} line: {reason}")]
pub struct LineError {
    pub line: &'static str,
    pub reason: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl LineError {
    pub fn new<E: Debug>(line: &'static str, err: E) -> Self {
        Self {
            line,
            reason: format!("{:?}", err),
        }
    }
}

impl<P> LineExt for P
where
    P: OutputPin,
    P::Error: Debug,
{
    fn drive(&mut self, high: bool, line: &'static str) -> Result<(), LineError> {
        let res = if high { self.set_high() } else { self.set_low() };

        res.map_err(|e| LineError::new(line, e))
    }
}

/// Any eight output pins form a parallel bus, pin `i` carrying bit `i`.
impl<P> ParallelBus for [P; 8]
where
    P: OutputPin,
    P::Error: Debug,
{
    type Error = P::Error;

    fn write_byte(&mut self, value: u8) -> Result<(), Self::Error> {
        for (bit, pin) in self.iter_mut().enumerate() {
            if value & (1 << bit) != 0 {
                pin.set_high()?;
            } else {
                pin.set_low()?;
            }
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
