//! # Relay bank
//!
//! The eight relays are driven through a transparent latch sitting on an 8-bit parallel bus. The
//! latch must be closed while the bus settles and opened only long enough to capture the new
//! value, then closed again so that unrelated writes to the bus do not reach the relays:
//!
//! ```text
//! LATCH  ‾‾\______________/‾‾‾‾‾‾‾‾‾\_______
//! BUS    ------< new value >--------------
//!                          |<-hold->|
//! ```
//!
//! The bank keeps a shadow of the register, which is the single source of truth for the relay
//! states. Every operation rewrites the whole register.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::{blocking::delay::DelayMs, digital::v2::OutputPin};
use log::{debug, trace};
use std::fmt::Debug;
use thiserror::Error;

use hw_if::{LineError, LineExt, ParallelBus, RelayIndex, RelayIndexError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time the latch is held open to capture a single relay change.
pub const STROBE_HOLD_MS: u16 = 1;

/// Time the latch is held open when clearing the whole bank. This is also the power-up
/// initialiser, so the relays must have settled before their state is relied upon.
pub const ALL_OFF_HOLD_MS: u16 = 5;

const LATCH_LINE: &str = "LATCH";
const BUS_LINE: &str = "relay data bus";

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Latched bank of eight relays.
pub struct RelayBank<B, L, D> {
    bus: B,
    latch: L,
    delay: D,

    /// Shadow of the latched register, bit `n - 1` for relay `n`
    mask: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid relay: {0}")]
    InvalidIndex(#[from] RelayIndexError),

    #[error(transparent)]
    Line(#[from] LineError),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<B, L, D> RelayBank<B, L, D>
where
    B: ParallelBus,
    L: OutputPin,
    L::Error: Debug,
    D: DelayMs<u16>,
{
    /// Create a bank over the given data bus and latch-enable line.
    ///
    /// No lines are touched, call [`RelayBank::init`] to bring the relays to a known state.
    pub fn new(bus: B, latch: L, delay: D) -> Self {
        Self {
            bus,
            latch,
            delay,
            mask: 0,
        }
    }

    /// Power-up initialisation, de-energizes every relay.
    pub fn init(&mut self) -> Result<(), RelayError> {
        self.all_off()
    }

    /// Energize one relay, leaving the others untouched.
    pub fn energize(&mut self, index: RelayIndex) -> Result<(), RelayError> {
        debug!("Energizing {}", index);
        self.apply(index.mask(), 0)
    }

    /// De-energize one relay, leaving the others untouched.
    pub fn de_energize(&mut self, index: RelayIndex) -> Result<(), RelayError> {
        debug!("De-energizing {}", index);
        self.apply(0, index.mask())
    }

    /// Energize a relay given by its board number.
    ///
    /// Numbers outside `1..=8` are rejected before anything is written.
    pub fn energize_number(&mut self, number: u8) -> Result<(), RelayError> {
        self.energize(RelayIndex::new(number)?)
    }

    /// De-energize a relay given by its board number.
    ///
    /// Numbers outside `1..=8` are rejected before anything is written.
    pub fn de_energize_number(&mut self, number: u8) -> Result<(), RelayError> {
        self.de_energize(RelayIndex::new(number)?)
    }

    /// De-energize every relay in a single, longer strobe.
    pub fn all_off(&mut self) -> Result<(), RelayError> {
        debug!("De-energizing all relays");
        self.strobe(0, ALL_OFF_HOLD_MS)
    }

    /// Clear the relays in `clear` and energize the relays in `set` within one strobe.
    ///
    /// Relays present in both masks end up energized.
    pub fn apply(&mut self, set: u8, clear: u8) -> Result<(), RelayError> {
        let mask = (self.mask & !clear) | set;
        self.strobe(mask, STROBE_HOLD_MS)
    }

    /// The current register value.
    pub fn mask(&self) -> u8 {
        self.mask
    }

    pub fn is_energized(&self, index: RelayIndex) -> bool {
        self.mask & index.mask() != 0
    }

    /// Latch `mask` into the relays.
    ///
    /// The shadow only takes the new value once the latch has been opened on it, so a failed write
    /// leaves it describing what the relays actually hold.
    fn strobe(&mut self, mask: u8, hold_ms: u16) -> Result<(), RelayError> {
        trace!("Strobing relay register {:#010b} (hold {} ms)", mask, hold_ms);

        self.latch.drive(false, LATCH_LINE)?;
        self.bus
            .write_byte(mask)
            .map_err(|e| LineError::new(BUS_LINE, e))?;
        self.latch.drive(true, LATCH_LINE)?;
        self.mask = mask;
        self.delay.delay_ms(hold_ms);
        self.latch.drive(false, LATCH_LINE)?;

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
