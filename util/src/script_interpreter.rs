//! # Gamepad script interpreter module
//!
//! This module replays scripted gamepad states, so that the manual demo can be
//! driven without a controller attached to the receiver.
//!
//! A script is a list of timestamped entries, one per line:
//!
//! ```text
//! 0.5: {"connected": true};
//! 1.0: {"connected": true, "start": true};
//! 2.0: {"connected": true, "up": true};
//! ```
//!
//! The payload is a JSON [`GamepadState`], any field not given is released
//! (or zero for stick axes). Each state stays current until the next entry's
//! time is reached.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use crate::session::get_elapsed_seconds;
use hw_if::{Gamepad, GamepadState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A gamepad state which is scripted to become current at a specific time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    /// The time the state becomes current
    exec_time_s: f64,

    state: GamepadState,
}

/// A script interpreter.
///
/// After loading a script use `.get_pending` (or the [`Gamepad`]
/// implementation, which uses the session clock) to acquire the state that is
/// current at a given time.
pub struct ScriptInterpreter {
    entries: VecDeque<Entry>,
    current: GamepadState,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Script contains an invalid timestamp: {0}. Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script timestamps must not decrease, found {1} s after {0} s")]
    OutOfOrder(f64, f64),

    #[error("Script contains an invalid gamepad state at {0} s: {1}")]
    InvalidState(f64, serde_json::Error),

    #[error("Could not build the script pattern: {0}")]
    BadPattern(regex::Error),
}

/// Result of polling the script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingState {
    /// The state current at the polled time
    Current(GamepadState),

    /// All entries have been consumed, the last state is carried
    EndOfScript(GamepadState),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        Self::parse(&script)
    }

    /// Create a new interpreter from the text of a script.
    pub fn parse(script: &str) -> Result<Self, ScriptError> {
        let mut entries: VecDeque<Entry> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::BadPattern)?;

        for cap in re.captures_iter(script) {
            let exec_time_s: f64 = cap[1]
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if let Some(prev) = entries.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(prev.exec_time_s, exec_time_s));
                }
            }

            let state: GamepadState = serde_json::from_str(&cap[3])
                .map_err(|e| ScriptError::InvalidState(exec_time_s, e))?;

            entries.push_back(Entry {
                exec_time_s,
                state: state.clamped(),
            });
        }

        if entries.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter {
            entries,
            current: GamepadState::default(),
        })
    }

    /// Return the state current at `time_s`.
    ///
    /// Before the first entry the controller reads as disconnected.
    pub fn get_pending(&mut self, time_s: f64) -> PendingState {
        while let Some(entry) = self.entries.front() {
            if entry.exec_time_s > time_s {
                break;
            }
            self.current = entry.state;
            self.entries.pop_front();
        }

        if self.entries.is_empty() {
            PendingState::EndOfScript(self.current)
        } else {
            PendingState::Current(self.current)
        }
    }

    /// Whether every entry has been consumed.
    pub fn is_finished(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the number of entries left in the script
    pub fn get_num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        self.entries.back().map(|e| e.exec_time_s).unwrap_or(0f64)
    }
}

/// Replays the script against the session clock.
impl Gamepad for ScriptInterpreter {
    type Error = std::convert::Infallible;

    fn read(&mut self) -> Result<GamepadState, Self::Error> {
        match self.get_pending(get_elapsed_seconds()) {
            PendingState::Current(s) | PendingState::EndOfScript(s) => Ok(s),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
