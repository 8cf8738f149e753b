//! # Faulty hardware
//!
//! Lines and buses that can be made to reject writes, used to check that errors carry the right
//! line name and that no shadow state runs ahead of the hardware.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::digital::v2::OutputPin;

use hw_if::{sim::SimPin, ParallelBus};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The write was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stuck;

/// A simulated line which rejects every write when broken.
pub struct FaultyPin {
    pin: SimPin,
    broken: bool,
}

/// A parallel bus which rejects every write.
pub struct DeadBus;

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl FaultyPin {
    pub fn healthy(pin: SimPin) -> Self {
        Self { pin, broken: false }
    }

    pub fn broken(pin: SimPin) -> Self {
        Self { pin, broken: true }
    }

    fn write(&mut self, high: bool) -> Result<(), Stuck> {
        if self.broken {
            return Err(Stuck);
        }

        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };

        res.map_err(|e| match e {})
    }
}

impl OutputPin for FaultyPin {
    type Error = Stuck;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

impl ParallelBus for DeadBus {
    type Error = Stuck;

    fn write_byte(&mut self, _value: u8) -> Result<(), Self::Error> {
        Err(Stuck)
    }
}
