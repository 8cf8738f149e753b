//! # Brush motor driver
//!
//! Drives H-bridge brush driver modules. The module reads the (RUN, DIR) pair as one of four
//! quadrants, of which three are used:
//!
//! | Status | Direction | RUN  | DIR  |
//! |--------|-----------|------|------|
//! | Run    | CW        | low  | high |
//! | Run    | CCW       | high | low  |
//! | Brake  | any       | low  | low  |
//!
//! Braking shorts the motor to ground, there is no fault latch and so no reset pulse.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::{digital::v2::OutputPin, PwmPin};
use log::{debug, trace};
use std::fmt::Debug;

use hw_if::{
    Direction, DriverOutputState, Duty, LineExt, MotorCommand, MotorPort, MotorStatus,
};

use super::{DriveKind, MotorDrvError, MotorDriver, PortLines, DIR_LINES, RUN_LINES};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

pub struct BrushDriver<P, W> {
    ports: [PortLines<P, W>; 2],
    state: [DriverOutputState; 2],
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<P, W> BrushDriver<P, W>
where
    P: OutputPin,
    P::Error: Debug,
    W: PwmPin<Duty = u16>,
{
    /// Create a new driver, enabling both PWM channels.
    pub fn new(port1: PortLines<P, W>, port2: PortLines<P, W>) -> Self {
        let mut ports = [port1, port2];
        for lines in ports.iter_mut() {
            lines.pwm.enable();
        }

        Self {
            ports,
            state: [DriverOutputState::default(); 2],
        }
    }

    /// Line levels (run, direction) for a status and direction.
    fn quadrant(status: MotorStatus, direction: Direction) -> (bool, bool) {
        match (status, direction) {
            (MotorStatus::Run, Direction::Clockwise) => (false, true),
            (MotorStatus::Run, Direction::CounterClockwise) => (true, false),
            (MotorStatus::Brake, _) => (false, false),
        }
    }
}

impl<P, W> MotorDriver for BrushDriver<P, W>
where
    P: OutputPin,
    P::Error: Debug,
    W: PwmPin<Duty = u16>,
{
    fn kind(&self) -> DriveKind {
        DriveKind::Brush
    }

    fn drive(
        &mut self,
        port: MotorPort,
        status: MotorStatus,
        direction: Direction,
    ) -> Result<(), MotorDrvError> {
        trace!("Brush {}: {:?} {:?}", port, status, direction);

        let i = port.index();
        let (run_line, direction_line) = Self::quadrant(status, direction);

        self.ports[i].run.drive(run_line, RUN_LINES[i])?;
        self.state[i].run_line = run_line;
        self.ports[i].dir.drive(direction_line, DIR_LINES[i])?;
        self.state[i].direction_line = direction_line;

        Ok(())
    }

    fn set_duty(&mut self, port: MotorPort, duty: Duty) -> Result<(), MotorDrvError> {
        let i = port.index();
        self.ports[i].pwm.set_duty(duty.get());
        self.state[i].pwm_duty = duty.get();
        Ok(())
    }

    fn brake_all(&mut self) -> Result<(), MotorDrvError> {
        debug!("Braking both brush ports");

        for port in MotorPort::ALL.iter() {
            self.drive(*port, MotorStatus::Brake, Direction::Clockwise)?;
        }

        Ok(())
    }

    fn output_state(&self, port: MotorPort) -> DriverOutputState {
        self.state[port.index()]
    }

    /// Both ports braked at zero duty.
    fn init(&mut self) -> Result<(), MotorDrvError> {
        debug!("Brush driver to power-up state");

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
    use hw_if::sim::{SimPin, SimPwm, SimTrace};
    use hw_if::LineError;

    type SimBrush = BrushDriver<SimPin, SimPwm>;

    /// (status, direction, run line, direction line)
    const TRUTH_TABLE: [(MotorStatus, Direction, bool, bool); 4] = [
        (MotorStatus::Run, Direction::Clockwise, false, true),
        (MotorStatus::Run, Direction::CounterClockwise, true, false),
        (MotorStatus::Brake, Direction::Clockwise, false, false),
        (MotorStatus::Brake, Direction::CounterClockwise, false, false),
    ];

    fn sim_driver() -> (SimTrace, SimBrush) {
        let trace = SimTrace::new();
        let drv = BrushDriver::new(
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
        );
        (trace, drv)
    }

    /// A driver whose `broken` line rejects every write.
    fn faulty_driver(trace: &SimTrace, broken: &str) -> BrushDriver<FaultyPin, SimPwm> {
        let pin = |name: &'static str| {
            if name == broken {
                FaultyPin::broken(trace.pin(name))
            } else {
                FaultyPin::healthy(trace.pin(name))
            }
        };

        BrushDriver::new(
            PortLines::new(pin("RUN1"), pin("DIR1"), trace.pwm("PWM1")),
            PortLines::new(pin("RUN2"), pin("DIR2"), trace.pwm("PWM2")),
        )
    }

    #[test]
    fn test_truth_table() {
        for port in MotorPort::ALL.iter() {
            let (run, dir, pwm) = match port {
                MotorPort::Port1 => ("RUN1", "DIR1", "PWM1"),
                MotorPort::Port2 => ("RUN2", "DIR2", "PWM2"),
            };

            for (status, direction, run_line, direction_line) in TRUTH_TABLE.iter() {
                let (trace, mut drv) = sim_driver();

                drv.command(
                    *port,
                    MotorCommand {
                        status: *status,
                        direction: *direction,
                        speed: Duty::new(77).unwrap(),
                    },
                )
                .unwrap();

                assert_eq!(
                    drv.output_state(*port),
                    DriverOutputState {
                        run_line: *run_line,
                        direction_line: *direction_line,
                        pwm_duty: 77,
                    },
                    "{} {:?} {:?}",
                    port,
                    status,
                    direction
                );
                assert_eq!(trace.level(run), Some(*run_line));
                assert_eq!(trace.level(dir), Some(*direction_line));
                assert_eq!(trace.duty(pwm), Some(77));

                // No time is spent, there is no pulse to wait on
                assert_eq!(trace.now_ms(), 0);
                assert_eq!(trace.len(), 3);
            }
        }
    }

    #[test]
    fn test_ramp_and_reverse() {
        let (trace, mut drv) = sim_driver();
        let port = MotorPort::Port2;

        drv.command(port, MotorCommand::run(Direction::Clockwise, Duty::new(10).unwrap()))
            .unwrap();
        for duty in (10..=1000).step_by(5) {
            drv.set_duty(port, Duty::new(duty).unwrap()).unwrap();
        }
        assert_eq!(trace.duty("PWM2"), Some(1000));

        drv.command(
            port,
            MotorCommand::run(Direction::CounterClockwise, Duty::new(1000).unwrap()),
        )
        .unwrap();
        assert_eq!(
            drv.output_state(port),
            DriverOutputState {
                run_line: true,
                direction_line: false,
                pwm_duty: 1000,
            }
        );
    }

    #[test]
    fn test_brake_all_and_init() {
        let (trace, mut drv) = sim_driver();

        drv.command(
            MotorPort::Port1,
            MotorCommand::run(Direction::CounterClockwise, Duty::MAX),
        )
        .unwrap();
        drv.brake_all().unwrap();

        for port in MotorPort::ALL.iter() {
            let state = drv.output_state(*port);
            assert!(!state.run_line);
            assert!(!state.direction_line);
        }
        // Duty untouched by the brake
        assert_eq!(drv.output_state(MotorPort::Port1).pwm_duty, 1023);

        drv.init().unwrap();
        for port in MotorPort::ALL.iter() {
            assert_eq!(drv.output_state(*port), DriverOutputState::default());
        }
        assert_eq!(trace.duty("PWM1"), Some(0));
        assert_eq!(drv.kind(), DriveKind::Brush);
    }

    #[test]
    fn test_line_failures() {
        // Running counter-clockwise raises the run line, a failed write must leave it low
        let trace = SimTrace::new();
        let mut drv = faulty_driver(&trace, "RUN1");
        assert!(matches!(
            drv.drive(
                MotorPort::Port1,
                MotorStatus::Run,
                Direction::CounterClockwise
            ),
            Err(MotorDrvError::Line(LineError { line: "RUN1", .. }))
        ));
        assert_eq!(
            drv.output_state(MotorPort::Port1),
            DriverOutputState::default()
        );
        assert!(trace.is_empty());

        let trace = SimTrace::new();
        let mut drv = faulty_driver(&trace, "DIR2");
        assert!(matches!(
            drv.drive(MotorPort::Port2, MotorStatus::Run, Direction::Clockwise),
            Err(MotorDrvError::Line(LineError { line: "DIR2", .. }))
        ));
        let state = drv.output_state(MotorPort::Port2);
        assert_eq!(trace.level("RUN2"), Some(state.run_line));
        assert!(!state.direction_line);
        assert!(trace.events_for("DIR2").is_empty());

        // The failure is passed on by the whole-driver commands
        assert!(matches!(
            drv.brake_all(),
            Err(MotorDrvError::Line(LineError { line: "DIR2", .. }))
        ));
        assert!(drv.init().is_err());
    }
}
