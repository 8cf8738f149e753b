//! # Relay addressing
//!
//! The board carries eight relays behind a latched 8-bit register, addressed `1..=8`. Pairs of
//! relays can stand in for an H-bridge direction selector for off-board motor drivers, giving four
//! external channels.

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

/// Number of relays on the board.
pub const NUM_RELAYS: u8 = 8;

/// Number of external driver channels, two relays each.
pub const NUM_EXT_CHANNELS: u8 = NUM_RELAYS / 2;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A checked relay number in `1..=8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RelayIndex(u8);

/// A checked external driver channel in `1..=4`.
///
/// Channel `k` uses relay `2k - 1` for clockwise and relay `2k` for counter-clockwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ExtChannel(u8);

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayIndexError {
    #[error("Relay number must be between 1 and {}, found {0}", NUM_RELAYS)]
    InvalidRelay(u8),

    #[error("External channel must be between 1 and {}, found {0}", NUM_EXT_CHANNELS)]
    InvalidChannel(u8),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl RelayIndex {
    /// Create a relay index, rejecting `0` and anything above [`NUM_RELAYS`].
    pub fn new(number: u8) -> Result<Self, RelayIndexError> {
        if number == 0 || number > NUM_RELAYS {
            return Err(RelayIndexError::InvalidRelay(number));
        }

        Ok(Self(number))
    }

    /// The relay number as printed on the board.
    pub fn number(self) -> u8 {
        self.0
    }

    /// The bit this relay occupies in the latch register.
    pub fn mask(self) -> u8 {
        1 << (self.0 - 1)
    }

    /// Iterate over all relays in order.
    pub fn all() -> impl Iterator<Item = RelayIndex> {
        (1..=NUM_RELAYS).map(RelayIndex)
    }
}

impl TryFrom<u8> for RelayIndex {
    type Error = RelayIndexError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        RelayIndex::new(value)
    }
}

impl From<RelayIndex> for u8 {
    fn from(index: RelayIndex) -> Self {
        index.0
    }
}

impl fmt::Display for RelayIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RLY{}", self.0)
    }
}

impl ExtChannel {
    /// Create a channel, rejecting `0` and anything above [`NUM_EXT_CHANNELS`].
    pub fn new(number: u8) -> Result<Self, RelayIndexError> {
        if number == 0 || number > NUM_EXT_CHANNELS {
            return Err(RelayIndexError::InvalidChannel(number));
        }

        Ok(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Relay energized for clockwise rotation.
    pub fn cw_relay(self) -> RelayIndex {
        RelayIndex(2 * self.0 - 1)
    }

    /// Relay energized for counter-clockwise rotation.
    pub fn ccw_relay(self) -> RelayIndex {
        RelayIndex(2 * self.0)
    }

    /// Iterate over all channels in order.
    pub fn all() -> impl Iterator<Item = ExtChannel> {
        (1..=NUM_EXT_CHANNELS).map(ExtChannel)
    }
}

impl TryFrom<u8> for ExtChannel {
    type Error = RelayIndexError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ExtChannel::new(value)
    }
}

impl From<ExtChannel> for u8 {
    fn from(channel: ExtChannel) -> Self {
        channel.0
    }
}

impl fmt::Display for ExtChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MD{}", self.0)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
