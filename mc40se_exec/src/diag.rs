//! # Diagnostics
//!
//! Actuation sequences used to check each output of the board by eye: motor ramps on each port for
//! both driver types, relay cycling, and direction cycling of the external drivers. Each sequence
//! returns a [`DiagReport`] describing what was done, which the executables save to the session.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::{blocking::delay::DelayMs, digital::v2::OutputPin};
use log::{debug, info};
use serde::Serialize;
use std::fmt::Debug;
use thiserror::Error;

use crate::{
    ext_drv::{ExtDrive, ExtDrivers, ExtDrvError},
    motor_drv::{DriveKind, MotorDrvError, MotorDriver},
    relay_bank::{RelayBank, RelayError},
};
use hw_if::{
    Direction, DriverOutputState, Duty, ExtChannel, MotorCommand, MotorPort, ParallelBus,
    RelayIndex,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Dwell at each duty value of a motor ramp.
pub const RAMP_DWELL_MS: u16 = 5;

/// Wait between the end of a motor ramp and the brake.
pub const PRE_BRAKE_MS: u16 = 100;

/// Time each relay, or each external driver direction, is held.
pub const RELAY_HOLD_MS: u16 = 2000;

/// Relays cycled by [`relay_cycle`].
pub const CYCLED_RELAYS: [u8; 4] = [1, 2, 3, 4];

/// External channels cycled by [`ext_driver_cycle`], wired to the MD3 and MD4 connectors.
pub const CYCLED_EXT_CHANNELS: [u8; 2] = [3, 4];

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Record of a diagnostic sequence.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DiagReport {
    /// Name of the sequence
    pub name: String,

    pub steps: Vec<DiagStep>,

    /// Final state of both motor ports, for motor sequences
    pub motor_states: Option<[DriverOutputState; 2]>,

    /// Final relay register, for relay sequences
    pub relay_mask: Option<u8>,

    /// Time spent in the sequence's own waits
    pub dwell_ms: u64,
}

/// One step of a sequence.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagStep {
    /// Dwell time elapsed when the step started
    pub at_ms: u64,

    pub description: String,
}

/// Parameters of a motor ramp test.
struct RampTest {
    name: &'static str,
    kind: DriveKind,
    start: u16,
    peak: u16,
    end: u16,
    step: u16,
}

/// Runs a sequence, recording its steps and waits.
struct Sequencer<'d, D> {
    delay: &'d mut D,
    report: DiagReport,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DiagError {
    #[error("Motor driver failure: {0}")]
    MotorDrv(#[from] MotorDrvError),

    #[error("Relay bank failure: {0}")]
    Relay(#[from] RelayError),

    #[error("External driver failure: {0}")]
    ExtDrv(#[from] ExtDrvError),

    #[error("The {name} sequence needs a {expected} driver but the board has a {found} driver")]
    WrongDriver {
        name: &'static str,
        expected: DriveKind,
        found: DriveKind,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<'d, D: DelayMs<u16>> Sequencer<'d, D> {
    fn new(name: &str, delay: &'d mut D) -> Self {
        info!("Starting {} sequence", name);

        Self {
            delay,
            report: DiagReport {
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    fn step<S: Into<String>>(&mut self, description: S) {
        let description = description.into();
        debug!("[{:>6} ms] {}", self.report.dwell_ms, description);

        self.report.steps.push(DiagStep {
            at_ms: self.report.dwell_ms,
            description,
        });
    }

    fn wait(&mut self, ms: u16) {
        self.delay.delay_ms(ms);
        self.report.dwell_ms += ms as u64;
    }

    fn finish(self) -> DiagReport {
        info!(
            "{} sequence complete ({} steps, {} ms)",
            self.report.name,
            self.report.steps.len(),
            self.report.dwell_ms
        );
        self.report
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Duty values from `from` to `to` in steps of `step`, including both ends.
///
/// The last step is shortened if needed so that `to` is always reached. A zero step is treated as
/// one.
pub fn ramp(from: u16, to: u16, step: u16) -> Vec<u16> {
    let step = step.max(1);
    let mut values = vec![from];
    let mut value = from;

    while value != to {
        value = if to > value {
            value.saturating_add(step).min(to)
        } else {
            value.saturating_sub(step).max(to)
        };
        values.push(value);
    }

    values
}

/// Brushless ramp test on one port.
///
/// Runs clockwise from duty 20 up to 1000 in steps of 10, reverses to counter-clockwise at 1000 and
/// ramps down to 50, then brakes.
pub fn brushless_test<M, D>(
    driver: &mut M,
    delay: &mut D,
    port: MotorPort,
) -> Result<DiagReport, DiagError>
where
    M: MotorDriver + ?Sized,
    D: DelayMs<u16>,
{
    motor_ramp_test(
        driver,
        delay,
        port,
        &RampTest {
            name: "brushless",
            kind: DriveKind::Brushless,
            start: 20,
            peak: 1000,
            end: 50,
            step: 10,
        },
    )
}

/// Brush ramp test on one port.
///
/// Runs clockwise from duty 10 up to 1000 in steps of 5, reverses to counter-clockwise at 1000 and
/// ramps down to 10, then brakes.
pub fn brush_test<M, D>(
    driver: &mut M,
    delay: &mut D,
    port: MotorPort,
) -> Result<DiagReport, DiagError>
where
    M: MotorDriver + ?Sized,
    D: DelayMs<u16>,
{
    motor_ramp_test(
        driver,
        delay,
        port,
        &RampTest {
            name: "brush",
            kind: DriveKind::Brush,
            start: 10,
            peak: 1000,
            end: 10,
            step: 5,
        },
    )
}

/// Energize relays 1 to 4 in turn, each for [`RELAY_HOLD_MS`], for the given number of cycles.
///
/// The bank is cleared before and after.
pub fn relay_cycle<B, L, RD, D>(
    relays: &mut RelayBank<B, L, RD>,
    delay: &mut D,
    cycles: usize,
) -> Result<DiagReport, DiagError>
where
    B: ParallelBus,
    L: OutputPin,
    L::Error: Debug,
    RD: DelayMs<u16>,
    D: DelayMs<u16>,
{
    let mut seq = Sequencer::new("relays", delay);

    seq.step("All relays off");
    relays.all_off()?;

    for cycle in 0..cycles {
        for number in CYCLED_RELAYS.iter() {
            let index = RelayIndex::new(*number).map_err(RelayError::from)?;

            seq.step(format!("Cycle {}: {} on", cycle + 1, index));
            relays.energize(index)?;
            seq.wait(RELAY_HOLD_MS);
            relays.de_energize(index)?;
        }
    }

    seq.step("All relays off");
    relays.all_off()?;

    seq.report.relay_mask = Some(relays.mask());
    Ok(seq.finish())
}

/// Drive external channels 3 and 4 clockwise then counter-clockwise, each for [`RELAY_HOLD_MS`],
/// for the given number of cycles.
///
/// The bank is cleared before each channel and at the end.
pub fn ext_driver_cycle<B, L, RD, D>(
    relays: &mut RelayBank<B, L, RD>,
    delay: &mut D,
    cycles: usize,
) -> Result<DiagReport, DiagError>
where
    B: ParallelBus,
    L: OutputPin,
    L::Error: Debug,
    RD: DelayMs<u16>,
    D: DelayMs<u16>,
{
    let mut seq = Sequencer::new("ext_drv", delay);
    let mut ext = ExtDrivers::new(relays);

    for cycle in 0..cycles {
        for number in CYCLED_EXT_CHANNELS.iter() {
            let channel = ExtChannel::new(*number).map_err(RelayError::from)?;

            ext.all_off()?;

            for demand in [ExtDrive::Clockwise, ExtDrive::CounterClockwise].iter() {
                seq.step(format!("Cycle {}: {} {:?}", cycle + 1, channel, demand));
                ext.drive(channel, *demand)?;
                seq.wait(RELAY_HOLD_MS);
            }
        }
    }

    seq.step("All relays off");
    ext.all_off()?;

    seq.report.relay_mask = Some(relays.mask());
    Ok(seq.finish())
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn motor_ramp_test<M, D>(
    driver: &mut M,
    delay: &mut D,
    port: MotorPort,
    test: &RampTest,
) -> Result<DiagReport, DiagError>
where
    M: MotorDriver + ?Sized,
    D: DelayMs<u16>,
{
    if driver.kind() != test.kind {
        return Err(DiagError::WrongDriver {
            name: test.name,
            expected: test.kind,
            found: driver.kind(),
        });
    }

    let mut seq = Sequencer::new(&format!("{} {}", test.name, port), delay);

    seq.step(format!("Run CW, ramp {} to {}", test.start, test.peak));
    driver.command(
        port,
        MotorCommand::run(Direction::Clockwise, Duty::saturating(test.start)),
    )?;
    for duty in ramp(test.start, test.peak, test.step) {
        driver.set_duty(port, Duty::saturating(duty))?;
        seq.wait(RAMP_DWELL_MS);
    }

    seq.step(format!("Run CCW, ramp {} to {}", test.peak, test.end));
    driver.command(
        port,
        MotorCommand::run(Direction::CounterClockwise, Duty::saturating(test.peak)),
    )?;
    for duty in ramp(test.peak, test.end, test.step) {
        driver.set_duty(port, Duty::saturating(duty))?;
        seq.wait(RAMP_DWELL_MS);
    }

    seq.wait(PRE_BRAKE_MS);
    seq.step("Brake");
    driver.command(port, MotorCommand::brake(Direction::CounterClockwise))?;

    seq.report.motor_states = Some([
        driver.output_state(MotorPort::Port1),
        driver.output_state(MotorPort::Port2),
    ]);
    Ok(seq.finish())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::board::{sim_brush, sim_brushless, sim_relay_bank};
    use hw_if::sim::{SimTrace, TraceKind};

    fn bytes(trace: &SimTrace) -> Vec<u8> {
        trace
            .events_for("PORTD")
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Byte(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    fn duties(trace: &SimTrace, source: &str) -> Vec<u16> {
        trace
            .events_for(source)
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Duty(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_ramp() {
        assert_eq!(ramp(20, 60, 10), vec![20, 30, 40, 50, 60]);
        assert_eq!(ramp(60, 20, 10), vec![60, 50, 40, 30, 20]);
        assert_eq!(ramp(0, 7, 5), vec![0, 5, 7]);
        assert_eq!(ramp(5, 5, 5), vec![5]);
        assert_eq!(ramp(0, 2, 0), vec![0, 1, 2]);
        assert_eq!(ramp(20, 1000, 10).len(), 99);
    }

    #[test]
    fn test_brushless_sequence() {
        let trace = SimTrace::new();
        let mut drv = sim_brushless(&trace);
        let mut clock = trace.clock();

        let report = brushless_test(&mut drv, &mut clock, MotorPort::Port2).unwrap();

        let pwm = duties(&trace, "PWM2");
        assert_eq!(pwm.first(), Some(&20));
        assert!(pwm.contains(&1000));
        assert!(pwm.contains(&50));
        assert_eq!(pwm.last(), Some(&0));
        assert!(trace.events_for("PWM1").is_empty());

        assert_eq!(report.dwell_ms, (99 + 96) * 5 + 100);
        assert_eq!(report.steps.len(), 3);
        assert_eq!(
            report.motor_states.map(|s| s[1]),
            Some(DriverOutputState {
                run_line: true,
                direction_line: false,
                pwm_duty: 0,
            })
        );

        // The brake pulses the reset line once
        assert_eq!(trace.events_for("BL_R").len(), 2);
    }

    #[test]
    fn test_brush_sequence() {
        let trace = SimTrace::new();
        let mut drv = sim_brush(&trace);
        let mut clock = trace.clock();

        let report = brush_test(&mut drv, &mut clock, MotorPort::Port1).unwrap();

        let pwm = duties(&trace, "PWM1");
        assert_eq!(pwm.iter().max(), Some(&1000));
        assert_eq!(pwm.last(), Some(&0));
        assert_eq!(report.dwell_ms, (199 + 199) * 5 + 100);
        assert_eq!(trace.now_ms(), report.dwell_ms);
        assert_eq!(
            report.motor_states.map(|s| s[0]),
            Some(DriverOutputState::default())
        );
    }

    #[test]
    fn test_wrong_driver() {
        let trace = SimTrace::new();
        let mut clock = trace.clock();

        assert!(matches!(
            brushless_test(&mut sim_brush(&trace), &mut clock, MotorPort::Port1),
            Err(DiagError::WrongDriver {
                expected: DriveKind::Brushless,
                ..
            })
        ));
        assert!(matches!(
            brush_test(&mut sim_brushless(&trace), &mut clock, MotorPort::Port1),
            Err(DiagError::WrongDriver {
                expected: DriveKind::Brush,
                ..
            })
        ));
        assert!(trace.is_empty());
    }

    #[test]
    fn test_relay_cycle() {
        let trace = SimTrace::new();
        let mut bank = sim_relay_bank(&trace);
        let mut clock = trace.clock();

        let report = relay_cycle(&mut bank, &mut clock, 2).unwrap();

        let mut expected = vec![0u8];
        for _ in 0..2 {
            for mask in [0x01u8, 0x02, 0x04, 0x08].iter() {
                expected.push(*mask);
                expected.push(0);
            }
        }
        expected.push(0);

        assert_eq!(bytes(&trace), expected);
        assert_eq!(report.relay_mask, Some(0));
        assert_eq!(report.dwell_ms, 8 * 2000);
    }

    #[test]
    fn test_ext_driver_cycle() {
        let trace = SimTrace::new();
        let mut bank = sim_relay_bank(&trace);
        let mut clock = trace.clock();

        let report = ext_driver_cycle(&mut bank, &mut clock, 1).unwrap();

        assert_eq!(bytes(&trace), vec![0, 0x10, 0x20, 0, 0x40, 0x80, 0]);
        assert_eq!(report.relay_mask, Some(0));
        assert_eq!(report.dwell_ms, 4 * 2000);
        assert_eq!(bank.mask(), 0);
    }

    #[test]
    fn test_report_json() {
        let trace = SimTrace::new();
        let mut bank = sim_relay_bank(&trace);
        let mut clock = trace.clock();

        let report = relay_cycle(&mut bank, &mut clock, 1).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["name"], "relays");
        assert_eq!(json["relay_mask"], 0);
        assert_eq!(json["motor_states"], serde_json::Value::Null);
        assert_eq!(json["steps"][1]["description"], "Cycle 1: RLY1 on");
        assert_eq!(json["steps"][2]["at_ms"], 2000);
    }
}
