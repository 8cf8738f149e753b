//! # External driver adapter
//!
//! Off-board motor drivers without a PWM input are switched through pairs of relays on the relay
//! bank. Channel `k` energizes relay `2k - 1` to turn clockwise and relay `2k` to turn
//! counter-clockwise. At most one relay of a pair is ever energized: a direction change clears the
//! opposite relay in the same latch strobe that energizes the new one.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::{blocking::delay::DelayMs, digital::v2::OutputPin};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

use crate::relay_bank::{RelayBank, RelayError};
use hw_if::{ExtChannel, ParallelBus};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// External drivers, borrowing the relay bank for as long as they are driven.
pub struct ExtDrivers<'a, B, L, D> {
    relays: &'a mut RelayBank<B, L, D>,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Demand on one external driver channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtDrive {
    Off,
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Error)]
pub enum ExtDrvError {
    #[error("Relay bank failure: {0}")]
    Relay(#[from] RelayError),

    #[error("Both relays of {0} are energized, the bank was written outside the adapter")]
    BothEnergized(ExtChannel),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Default for ExtDrive {
    fn default() -> Self {
        ExtDrive::Off
    }
}

impl<'a, B, L, D> ExtDrivers<'a, B, L, D>
where
    B: ParallelBus,
    L: OutputPin,
    L::Error: Debug,
    D: DelayMs<u16>,
{
    pub fn new(relays: &'a mut RelayBank<B, L, D>) -> Self {
        Self { relays }
    }

    /// Drive one channel.
    ///
    /// Nothing is written if the channel already holds the demand. A pair found with both relays
    /// energized is overwritten with the demand.
    pub fn drive(&mut self, channel: ExtChannel, demand: ExtDrive) -> Result<(), ExtDrvError> {
        match self.state(channel) {
            Ok(current) if current == demand => return Ok(()),
            Ok(_) => (),
            Err(e) => warn!("{}, forcing {:?}", e, demand),
        }

        debug!("{} -> {:?}", channel, demand);

        let cw = channel.cw_relay().mask();
        let ccw = channel.ccw_relay().mask();

        let (set, clear) = match demand {
            ExtDrive::Off => (0, cw | ccw),
            ExtDrive::Clockwise => (cw, ccw),
            ExtDrive::CounterClockwise => (ccw, cw),
        };

        self.relays.apply(set, clear)?;

        Ok(())
    }

    /// The demand a channel currently holds, read back from the relay register.
    pub fn state(&self, channel: ExtChannel) -> Result<ExtDrive, ExtDrvError> {
        let cw = self.relays.is_energized(channel.cw_relay());
        let ccw = self.relays.is_energized(channel.ccw_relay());

        match (cw, ccw) {
            (false, false) => Ok(ExtDrive::Off),
            (true, false) => Ok(ExtDrive::Clockwise),
            (false, true) => Ok(ExtDrive::CounterClockwise),
            (true, true) => Err(ExtDrvError::BothEnergized(channel)),
        }
    }

    /// De-energize the whole relay bank.
    pub fn all_off(&mut self) -> Result<(), ExtDrvError> {
        self.relays.all_off()?;
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::board::sim_relay_bank;
    use hw_if::{sim::SimTrace, RelayIndex};

    fn channel(n: u8) -> ExtChannel {
        ExtChannel::new(n).unwrap()
    }

    #[test]
    fn test_relay_pairs() {
        let trace = SimTrace::new();
        let mut bank = sim_relay_bank(&trace);
        let mut ext = ExtDrivers::new(&mut bank);

        for ch in ExtChannel::all() {
            ext.drive(ch, ExtDrive::Clockwise).unwrap();
            assert_eq!(ext.state(ch).unwrap(), ExtDrive::Clockwise);
            assert_eq!(trace.byte("PORTD"), Some(ch.cw_relay().mask()));

            ext.drive(ch, ExtDrive::CounterClockwise).unwrap();
            assert_eq!(ext.state(ch).unwrap(), ExtDrive::CounterClockwise);
            assert_eq!(trace.byte("PORTD"), Some(ch.ccw_relay().mask()));

            ext.drive(ch, ExtDrive::Off).unwrap();
            assert_eq!(ext.state(ch).unwrap(), ExtDrive::Off);
            assert_eq!(trace.byte("PORTD"), Some(0));
        }
    }

    #[test]
    fn test_never_both_energized() {
        let trace = SimTrace::new();
        let mut bank = sim_relay_bank(&trace);
        let mut ext = ExtDrivers::new(&mut bank);
        let ch = channel(3);

        ext.drive(ch, ExtDrive::Clockwise).unwrap();
        ext.drive(ch, ExtDrive::CounterClockwise).unwrap();
        ext.drive(ch, ExtDrive::Clockwise).unwrap();

        // Relays 5 and 6 are never latched together
        let pair = ch.cw_relay().mask() | ch.ccw_relay().mask();
        for event in trace.events_for("PORTD") {
            if let hw_if::sim::TraceKind::Byte(b) = event.kind {
                assert_ne!(b & pair, pair);
            }
        }
        assert_eq!(trace.events_for("PORTD").len(), 3);
    }

    #[test]
    fn test_channels_independent() {
        let trace = SimTrace::new();
        let mut bank = sim_relay_bank(&trace);

        {
            let mut ext = ExtDrivers::new(&mut bank);
            ext.drive(channel(1), ExtDrive::Clockwise).unwrap();
            ext.drive(channel(2), ExtDrive::CounterClockwise).unwrap();
            ext.drive(channel(1), ExtDrive::Off).unwrap();

            assert_eq!(ext.state(channel(2)).unwrap(), ExtDrive::CounterClockwise);

            // Unchanged demands write nothing
            let marker = trace.len();
            ext.drive(channel(2), ExtDrive::CounterClockwise).unwrap();
            assert_eq!(trace.len(), marker);
        }

        assert_eq!(bank.mask(), 0b0000_1000);
    }

    #[test]
    fn test_both_energized_detected() {
        let trace = SimTrace::new();
        let mut bank = sim_relay_bank(&trace);
        bank.energize(RelayIndex::new(7).unwrap()).unwrap();
        bank.energize(RelayIndex::new(8).unwrap()).unwrap();

        let mut ext = ExtDrivers::new(&mut bank);
        assert!(matches!(
            ext.state(channel(4)),
            Err(ExtDrvError::BothEnergized(_))
        ));

        ext.all_off().unwrap();
        ext.drive(channel(4), ExtDrive::Clockwise).unwrap();
        assert_eq!(bank.mask(), 0b0100_0000);
    }

    #[test]
    fn test_both_energized_overwritten() {
        let trace = SimTrace::new();
        let mut bank = sim_relay_bank(&trace);
        bank.energize(RelayIndex::new(1).unwrap()).unwrap();
        bank.energize(RelayIndex::new(2).unwrap()).unwrap();

        {
            let mut ext = ExtDrivers::new(&mut bank);
            ext.drive(channel(1), ExtDrive::Off).unwrap();
            assert_eq!(ext.state(channel(1)).unwrap(), ExtDrive::Off);
        }
        assert_eq!(bank.mask(), 0);
        assert_eq!(trace.byte("PORTD"), Some(0));

        // A direction demand also resolves the pair in one strobe
        bank.apply(0b0000_0011, 0).unwrap();
        let marker = trace.len();
        ExtDrivers::new(&mut bank)
            .drive(channel(1), ExtDrive::Clockwise)
            .unwrap();
        assert_eq!(bank.mask(), 0b0000_0001);
        assert_eq!(trace.events_since(marker).len(), 4);
    }
}
