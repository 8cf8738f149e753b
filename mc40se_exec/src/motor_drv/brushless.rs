//! # Brushless motor driver
//!
//! Drives ESC-style brushless controllers. Per port:
//!
//! | Status | Direction | RUN  | DIR  |
//! |--------|-----------|------|------|
//! | Run    | CW        | low  | high |
//! | Run    | CCW       | low  | low  |
//! | Brake  | CW        | high | high |
//! | Brake  | CCW       | high | low  |
//!
//! The ESC latches an internal fault when its run input is deasserted, so every brake is followed
//! by a pulse on the reset line (low for [`BL_RESET_LOW_MS`], then high for [`BL_RESET_HIGH_MS`]).
//! The reset line is shared by both ports and owned by the driver, so brake transitions on the two
//! ports can never overlap.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::{blocking::delay::DelayMs, digital::v2::OutputPin, PwmPin};
use log::{debug, trace};
use std::fmt::Debug;

use hw_if::{
    Direction, DriverOutputState, Duty, LineExt, MotorCommand, MotorPort, MotorStatus,
};

use super::{
    DriveKind, MotorDrvError, MotorDriver, PortLines, BL_RESET_HIGH_MS, BL_RESET_LOW_MS,
    DIR_LINES, RUN_LINES,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const RESET_LINE: &str = "BL_R";

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

pub struct BrushlessDriver<P, W, D> {
    ports: [PortLines<P, W>; 2],

    /// Fault-reset line shared by both ESCs
    reset: P,

    delay: D,

    state: [DriverOutputState; 2],
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<P, W, D> BrushlessDriver<P, W, D>
where
    P: OutputPin,
    P::Error: Debug,
    W: PwmPin<Duty = u16>,
    D: DelayMs<u16>,
{
    /// Create a new driver, enabling both PWM channels.
    ///
    /// No lines are written until the first command, use [`MotorDriver::init`] to reach the
    /// power-up safe state.
    pub fn new(port1: PortLines<P, W>, port2: PortLines<P, W>, reset: P, delay: D) -> Self {
        let mut ports = [port1, port2];
        for lines in ports.iter_mut() {
            lines.pwm.enable();
        }

        Self {
            ports,
            reset,
            delay,
            state: [DriverOutputState::default(); 2],
        }
    }

    /// Drive the run line, which is active low.
    fn set_run_line(&mut self, port: MotorPort, run: bool) -> Result<(), MotorDrvError> {
        let i = port.index();
        self.ports[i].run.drive(!run, RUN_LINES[i])?;
        self.state[i].run_line = !run;
        Ok(())
    }

    fn set_direction_line(
        &mut self,
        port: MotorPort,
        direction: Direction,
    ) -> Result<(), MotorDrvError> {
        let i = port.index();
        let high = direction == Direction::Clockwise;
        self.ports[i].dir.drive(high, DIR_LINES[i])?;
        self.state[i].direction_line = high;
        Ok(())
    }

    /// Clear the ESC fault latch. Blocks for the whole pulse.
    fn reset_pulse(&mut self) -> Result<(), MotorDrvError> {
        trace!("Brushless fault-reset pulse");

        self.reset.drive(false, RESET_LINE)?;
        self.delay.delay_ms(BL_RESET_LOW_MS);
        self.reset.drive(true, RESET_LINE)?;
        self.delay.delay_ms(BL_RESET_HIGH_MS);

        Ok(())
    }
}

impl<P, W, D> MotorDriver for BrushlessDriver<P, W, D>
where
    P: OutputPin,
    P::Error: Debug,
    W: PwmPin<Duty = u16>,
    D: DelayMs<u16>,
{
    fn kind(&self) -> DriveKind {
        DriveKind::Brushless
    }

    fn drive(
        &mut self,
        port: MotorPort,
        status: MotorStatus,
        direction: Direction,
    ) -> Result<(), MotorDrvError> {
        trace!("Brushless {}: {:?} {:?}", port, status, direction);

        match status {
            MotorStatus::Run => self.set_run_line(port, true)?,
            MotorStatus::Brake => {
                self.set_run_line(port, false)?;
                self.reset_pulse()?;
            }
        }

        self.set_direction_line(port, direction)
    }

    fn set_duty(&mut self, port: MotorPort, duty: Duty) -> Result<(), MotorDrvError> {
        let i = port.index();
        self.ports[i].pwm.set_duty(duty.get());
        self.state[i].pwm_duty = duty.get();
        Ok(())
    }

    /// Deassert both run lines, then issue a single reset pulse for both ESCs.
    fn brake_all(&mut self) -> Result<(), MotorDrvError> {
        debug!("Braking both brushless ports");

        for port in MotorPort::ALL.iter() {
            self.set_run_line(*port, false)?;
        }

        self.reset_pulse()
    }

    fn output_state(&self, port: MotorPort) -> DriverOutputState {
        self.state[port.index()]
    }

    /// Port 1 braked clockwise, port 2 braked counter-clockwise, both at zero duty.
    fn init(&mut self) -> Result<(), MotorDrvError> {
        debug!("Brushless driver to power-up state");

        self.command(MotorPort::Port1, MotorCommand::brake(Direction::Clockwise))?;
        self.command(
            MotorPort::Port2,
            MotorCommand::brake(Direction::CounterClockwise),
        )
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::faulty::FaultyPin;
    use hw_if::sim::{Phase, SimClock, SimPin, SimPwm, SimTrace, TraceKind};
    use hw_if::LineError;

    type SimBrushless = BrushlessDriver<SimPin, SimPwm, SimClock>;

    /// (status, direction, run line, direction line)
    const TRUTH_TABLE: [(MotorStatus, Direction, bool, bool); 4] = [
        (MotorStatus::Run, Direction::Clockwise, false, true),
        (MotorStatus::Run, Direction::CounterClockwise, false, false),
        (MotorStatus::Brake, Direction::Clockwise, true, true),
        (MotorStatus::Brake, Direction::CounterClockwise, true, false),
    ];

    fn sim_driver() -> (SimTrace, SimBrushless) {
        let trace = SimTrace::new();
        let drv = BrushlessDriver::new(
            PortLines::new(
                trace.pin("RUN1"),
                trace.pin("DIR1"),
                trace.pwm("PWM1"),
            ),
            PortLines::new(
                trace.pin("RUN2"),
                trace.pin("DIR2"),
                trace.pwm("PWM2"),
            ),
            trace.pin("BL_R"),
            trace.clock(),
        );
        (trace, drv)
    }

    /// A driver whose `broken` line rejects every write.
    fn faulty_driver(
        trace: &SimTrace,
        broken: &str,
    ) -> BrushlessDriver<FaultyPin, SimPwm, SimClock> {
        let pin = |name: &'static str| {
            if name == broken {
                FaultyPin::broken(trace.pin(name))
            } else {
                FaultyPin::healthy(trace.pin(name))
            }
        };

        BrushlessDriver::new(
            PortLines::new(pin("RUN1"), pin("DIR1"), trace.pwm("PWM1")),
            PortLines::new(pin("RUN2"), pin("DIR2"), trace.pwm("PWM2")),
            pin("BL_R"),
            trace.clock(),
        )
    }

    fn names(port: MotorPort) -> (&'static str, &'static str, &'static str) {
        match port {
            MotorPort::Port1 => ("RUN1", "DIR1", "PWM1"),
            MotorPort::Port2 => ("RUN2", "DIR2", "PWM2"),
        }
    }

    fn other(port: MotorPort) -> MotorPort {
        match port {
            MotorPort::Port1 => MotorPort::Port2,
            MotorPort::Port2 => MotorPort::Port1,
        }
    }

    #[test]
    fn test_truth_table() {
        for port in MotorPort::ALL.iter() {
            for (status, direction, run_line, direction_line) in TRUTH_TABLE.iter() {
                let (trace, mut drv) = sim_driver();
                let (run, dir, pwm) = names(*port);

                drv.command(
                    *port,
                    MotorCommand {
                        status: *status,
                        direction: *direction,
                        speed: Duty::new(321).unwrap(),
                    },
                )
                .unwrap();

                assert_eq!(
                    drv.output_state(*port),
                    DriverOutputState {
                        run_line: *run_line,
                        direction_line: *direction_line,
                        pwm_duty: 321,
                    },
                    "{} {:?} {:?}",
                    port,
                    status,
                    direction
                );
                assert_eq!(trace.level(run), Some(*run_line));
                assert_eq!(trace.level(dir), Some(*direction_line));
                assert_eq!(trace.duty(pwm), Some(321));

                // The other port is never touched
                let (o_run, o_dir, o_pwm) = names(other(*port));
                assert!(trace.events_for(o_run).is_empty());
                assert!(trace.events_for(o_dir).is_empty());
                assert!(trace.events_for(o_pwm).is_empty());

                // Only a brake pulses the reset line
                let pulses = trace.events_for("BL_R").len();
                match status {
                    MotorStatus::Run => assert_eq!(pulses, 0),
                    MotorStatus::Brake => assert_eq!(pulses, 2),
                }
            }
        }
    }

    #[test]
    fn test_brake_reset_pulse() {
        let speeds = [0u16, 1, 512, 1023];

        for port in MotorPort::ALL.iter() {
            for direction in Direction::ALL.iter() {
                for speed in speeds.iter() {
                    let (trace, mut drv) = sim_driver();
                    let (run, _, _) = names(*port);

                    drv.command(*port, MotorCommand::run(*direction, Duty::MAX))
                        .unwrap();
                    trace.advance(100);
                    let start = trace.now_ms();
                    let marker = trace.len();

                    drv.command(
                        *port,
                        MotorCommand {
                            status: MotorStatus::Brake,
                            direction: *direction,
                            speed: Duty::new(*speed).unwrap(),
                        },
                    )
                    .unwrap();

                    let phases = trace.phases("BL_R");
                    assert_eq!(
                        phases,
                        vec![
                            Phase {
                                level: false,
                                start_ms: start,
                                end_ms: Some(start + 5),
                            },
                            Phase {
                                level: true,
                                start_ms: start + 5,
                                end_ms: None,
                            },
                        ]
                    );
                    assert!(phases[0].duration_ms(trace.now_ms()) >= BL_RESET_LOW_MS as u64);
                    assert!(phases[1].duration_ms(trace.now_ms()) >= BL_RESET_HIGH_MS as u64);

                    // The run line is released before the pulse starts
                    let events = trace.events_since(marker);
                    let run_pos = events.iter().position(|e| e.source == run).unwrap();
                    let rst_pos = events.iter().position(|e| e.source == "BL_R").unwrap();
                    assert!(run_pos < rst_pos);
                    assert_eq!(events[run_pos].kind, TraceKind::Level(true));

                    // The duty is written even though the motor is braked
                    assert_eq!(drv.output_state(*port).pwm_duty, *speed);
                }
            }
        }
    }

    #[test]
    fn test_ramp_leaves_lines_alone() {
        let (trace, mut drv) = sim_driver();

        drv.command(
            MotorPort::Port1,
            MotorCommand::run(Direction::Clockwise, Duty::new(20).unwrap()),
        )
        .unwrap();

        for duty in (20..=1000).step_by(10) {
            drv.set_duty(MotorPort::Port1, Duty::new(duty).unwrap()).unwrap();
        }

        assert_eq!(trace.duty("PWM1"), Some(1000));
        assert_eq!(trace.events_for("RUN1").len(), 1);
        assert_eq!(trace.events_for("DIR1").len(), 1);
        assert_eq!(
            drv.output_state(MotorPort::Port1),
            DriverOutputState {
                run_line: false,
                direction_line: true,
                pwm_duty: 1000,
            }
        );
    }

    #[test]
    fn test_brake_all_single_pulse() {
        let (trace, mut drv) = sim_driver();

        drv.command(MotorPort::Port1, MotorCommand::run(Direction::Clockwise, Duty::MAX))
            .unwrap();
        drv.command(
            MotorPort::Port2,
            MotorCommand::run(Direction::CounterClockwise, Duty::MAX),
        )
        .unwrap();
        let marker = trace.len();

        drv.brake_all().unwrap();

        let events = trace.events_since(marker);
        assert_eq!(events.iter().filter(|e| e.source == "BL_R").count(), 2);
        assert!(events.iter().all(|e| !e.source.starts_with("PWM")));
        assert!(events.iter().all(|e| !e.source.starts_with("DIR")));

        for port in MotorPort::ALL.iter() {
            let state = drv.output_state(*port);
            assert!(state.run_line);
            assert_eq!(state.pwm_duty, Duty::MAX.get());
        }
        assert_eq!(trace.now_ms(), 15);
    }

    #[test]
    fn test_init() {
        let (trace, mut drv) = sim_driver();

        drv.init().unwrap();

        assert_eq!(
            drv.output_state(MotorPort::Port1),
            DriverOutputState {
                run_line: true,
                direction_line: true,
                pwm_duty: 0,
            }
        );
        assert_eq!(
            drv.output_state(MotorPort::Port2),
            DriverOutputState {
                run_line: true,
                direction_line: false,
                pwm_duty: 0,
            }
        );
        assert_eq!(trace.phases("BL_R").len(), 4);
        assert_eq!(drv.kind(), DriveKind::Brushless);
    }

    #[test]
    fn test_run_line_failure() {
        let trace = SimTrace::new();
        let mut drv = faulty_driver(&trace, "RUN1");

        let err = drv
            .drive(MotorPort::Port1, MotorStatus::Brake, Direction::Clockwise)
            .unwrap_err();
        assert!(matches!(err, MotorDrvError::Line(LineError { line: "RUN1", .. })));

        // Nothing after the failed write is attempted
        assert_eq!(
            drv.output_state(MotorPort::Port1),
            DriverOutputState::default()
        );
        assert!(trace.is_empty());
    }

    #[test]
    fn test_direction_line_failure() {
        let trace = SimTrace::new();
        let mut drv = faulty_driver(&trace, "DIR2");

        let err = drv
            .drive(MotorPort::Port2, MotorStatus::Brake, Direction::Clockwise)
            .unwrap_err();
        assert!(matches!(err, MotorDrvError::Line(LineError { line: "DIR2", .. })));

        // The run line and the pulse went out, the shadow follows the lines that were written
        assert_eq!(trace.level("RUN2"), Some(true));
        assert_eq!(trace.phases("BL_R").len(), 2);
        assert_eq!(
            drv.output_state(MotorPort::Port2),
            DriverOutputState {
                run_line: true,
                direction_line: false,
                pwm_duty: 0,
            }
        );
    }

    #[test]
    fn test_reset_line_failure() {
        let trace = SimTrace::new();
        let mut drv = faulty_driver(&trace, "BL_R");

        assert!(matches!(
            drv.drive(MotorPort::Port1, MotorStatus::Brake, Direction::Clockwise),
            Err(MotorDrvError::Line(LineError { line: "BL_R", .. }))
        ));
        assert!(matches!(
            drv.brake_all(),
            Err(MotorDrvError::Line(LineError { line: "BL_R", .. }))
        ));

        let braked = [(MotorPort::Port1, "RUN1"), (MotorPort::Port2, "RUN2")];
        for (port, run) in braked.iter() {
            assert_eq!(trace.level(run), Some(true));
            assert!(drv.output_state(*port).run_line);
            assert!(!drv.output_state(*port).direction_line);
        }
        assert!(trace.events_for("DIR1").is_empty());

        // Running does not need the reset line
        drv.drive(MotorPort::Port1, MotorStatus::Run, Direction::Clockwise)
            .unwrap();
        assert_eq!(
            drv.output_state(MotorPort::Port1),
            DriverOutputState {
                run_line: false,
                direction_line: true,
                pwm_duty: 0,
            }
        );
    }
}
