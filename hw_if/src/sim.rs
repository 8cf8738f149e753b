//! # Simulated board hardware
//!
//! Recording implementations of the hardware seams. Every line level write, PWM duty write and
//! bus write is appended to a shared [`SimTrace`], stamped with a virtual millisecond clock. Delays
//! taken through [`SimClock`] advance that clock instantly, so timing requirements such as pulse
//! widths can be checked exactly and without waiting.
//!
//! The simulation is single threaded, all handles share the trace through an `Rc`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::{
    blocking::delay::DelayMs,
    digital::v2::OutputPin,
    PwmPin,
};
use log::trace;
use serde::Serialize;
use std::{cell::RefCell, convert::Infallible, rc::Rc};

use crate::line::ParallelBus;
use crate::motor::MAX_DUTY;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Shared, timestamped record of everything written to the simulated board.
#[derive(Clone, Default)]
pub struct SimTrace {
    inner: Rc<RefCell<TraceInner>>,
}

#[derive(Default)]
struct TraceInner {
    now_ms: u64,
    events: Vec<TraceEvent>,
}

/// A single write to the simulated hardware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    /// Virtual time of the write
    pub time_ms: u64,

    /// Name of the line, PWM channel or bus written
    pub source: &'static str,

    pub kind: TraceKind,
}

/// A period during which a line held one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phase {
    pub level: bool,
    pub start_ms: u64,

    /// `None` if the line still holds this level.
    pub end_ms: Option<u64>,
}

/// Virtual millisecond clock.
#[derive(Clone)]
pub struct SimClock {
    trace: SimTrace,
}

/// Simulated digital output line.
pub struct SimPin {
    name: &'static str,
    level: bool,
    trace: SimTrace,
}

/// Simulated 10-bit PWM channel.
pub struct SimPwm {
    name: &'static str,
    duty: u16,
    trace: SimTrace,
}

/// Simulated 8-bit parallel output port.
pub struct SimBus {
    name: &'static str,
    trace: SimTrace,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TraceKind {
    /// A line was driven to a level, `true` is high
    Level(bool),

    /// A PWM duty register was written
    Duty(u16),

    /// A parallel bus was written
    Byte(u8),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl SimTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock sharing this trace's virtual time.
    pub fn clock(&self) -> SimClock {
        SimClock {
            trace: self.clone(),
        }
    }

    /// A new output line, initially low. The initial level is not recorded.
    pub fn pin(&self, name: &'static str) -> SimPin {
        SimPin {
            name,
            level: false,
            trace: self.clone(),
        }
    }

    /// A new PWM channel at zero duty.
    pub fn pwm(&self, name: &'static str) -> SimPwm {
        SimPwm {
            name,
            duty: 0,
            trace: self.clone(),
        }
    }

    /// A new parallel bus, initially all low.
    pub fn bus(&self, name: &'static str) -> SimBus {
        SimBus {
            name,
            trace: self.clone(),
        }
    }

    /// Current virtual time.
    pub fn now_ms(&self) -> u64 {
        self.inner.borrow().now_ms
    }

    /// Advance virtual time.
    pub fn advance(&self, ms: u64) {
        self.inner.borrow_mut().now_ms += ms;
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.inner.borrow().events.clone()
    }

    /// All recorded events for one source, oldest first.
    pub fn events_for(&self, source: &str) -> Vec<TraceEvent> {
        self.inner
            .borrow()
            .events
            .iter()
            .filter(|e| e.source == source)
            .copied()
            .collect()
    }

    /// Number of events recorded so far. Useful as a marker for [`SimTrace::events_since`].
    pub fn len(&self) -> usize {
        self.inner.borrow().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events recorded after the given marker.
    pub fn events_since(&self, marker: usize) -> Vec<TraceEvent> {
        self.inner
            .borrow()
            .events
            .iter()
            .skip(marker)
            .copied()
            .collect()
    }

    /// Last level written to a line, if it has been written.
    pub fn level(&self, source: &str) -> Option<bool> {
        self.events_for(source)
            .iter()
            .rev()
            .find_map(|e| match e.kind {
                TraceKind::Level(l) => Some(l),
                _ => None,
            })
    }

    /// Last duty written to a PWM channel, if it has been written.
    pub fn duty(&self, source: &str) -> Option<u16> {
        self.events_for(source)
            .iter()
            .rev()
            .find_map(|e| match e.kind {
                TraceKind::Duty(d) => Some(d),
                _ => None,
            })
    }

    /// Last value written to a bus, if it has been written.
    pub fn byte(&self, source: &str) -> Option<u8> {
        self.events_for(source)
            .iter()
            .rev()
            .find_map(|e| match e.kind {
                TraceKind::Byte(b) => Some(b),
                _ => None,
            })
    }

    /// Level history of a line as a sequence of phases.
    ///
    /// Repeated writes of the same level do not start a new phase. The first phase starts at the
    /// first write to the line.
    pub fn phases(&self, source: &str) -> Vec<Phase> {
        let mut phases: Vec<Phase> = Vec::new();

        for event in self.events_for(source) {
            let level = match event.kind {
                TraceKind::Level(l) => l,
                _ => continue,
            };

            if let Some(last) = phases.last_mut() {
                if last.level == level {
                    continue;
                }
                last.end_ms = Some(event.time_ms);
            }

            phases.push(Phase {
                level,
                start_ms: event.time_ms,
                end_ms: None,
            });
        }

        phases
    }

    fn record(&self, source: &'static str, kind: TraceKind) {
        let mut inner = self.inner.borrow_mut();
        let time_ms = inner.now_ms;

        trace!("[sim {:>8} ms] {} <- {:?}", time_ms, source, kind);

        inner.events.push(TraceEvent {
            time_ms,
            source,
            kind,
        });
    }
}

impl Phase {
    /// Length of the phase, measured up to `now_ms` if it has not ended yet.
    pub fn duration_ms(&self, now_ms: u64) -> u64 {
        self.end_ms.unwrap_or(now_ms) - self.start_ms
    }
}

impl SimClock {
    pub fn now_ms(&self) -> u64 {
        self.trace.now_ms()
    }
}

impl DelayMs<u8> for SimClock {
    fn delay_ms(&mut self, ms: u8) {
        self.trace.advance(ms as u64);
    }
}

impl DelayMs<u16> for SimClock {
    fn delay_ms(&mut self, ms: u16) {
        self.trace.advance(ms as u64);
    }
}

impl DelayMs<u32> for SimClock {
    fn delay_ms(&mut self, ms: u32) {
        self.trace.advance(ms as u64);
    }
}

impl SimPin {
    /// Current level, `true` if high.
    pub fn level(&self) -> bool {
        self.level
    }

    fn write(&mut self, level: bool) {
        self.level = level;
        self.trace.record(self.name, TraceKind::Level(level));
    }
}

impl OutputPin for SimPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

impl PwmPin for SimPwm {
    type Duty = u16;

    // Simulated channels are always live
    fn disable(&mut self) {}

    fn enable(&mut self) {}

    fn get_duty(&self) -> Self::Duty {
        self.duty
    }

    fn get_max_duty(&self) -> Self::Duty {
        MAX_DUTY
    }

    fn set_duty(&mut self, duty: Self::Duty) {
        self.duty = duty;
        self.trace.record(self.name, TraceKind::Duty(duty));
    }
}

impl ParallelBus for SimBus {
    type Error = Infallible;

    fn write_byte(&mut self, value: u8) -> Result<(), Self::Error> {
        self.trace.record(self.name, TraceKind::Byte(value));
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
