//! # Simulated board
//!
//! Wires the actuation layer to [`hw_if::sim`] hardware, using the MC40SE line names:
//!
//! | Line          | Use                                   |
//! |---------------|---------------------------------------|
//! | `RUN1`/`RUN2` | run/brake of motor ports 1 and 2      |
//! | `DIR1`/`DIR2` | direction of motor ports 1 and 2      |
//! | `PWM1`/`PWM2` | duty of motor ports 1 and 2           |
//! | `BL_R`        | brushless fault reset, shared         |
//! | `PORTD`       | relay data bus                        |
//! | `LATCH`       | relay latch enable                    |

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use thiserror::Error;

use crate::{
    motor_drv::{BrushDriver, BrushlessDriver, DriveKind, MotorDrvError, MotorDriver, PortLines},
    relay_bank::{RelayBank, RelayError},
};
use hw_if::sim::{SimBus, SimClock, SimPin, SimPwm, SimTrace};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

pub type SimRelayBank = RelayBank<SimBus, SimPin, SimClock>;
pub type SimBrushless = BrushlessDriver<SimPin, SimPwm, SimClock>;
pub type SimBrush = BrushDriver<SimPin, SimPwm>;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The board's actuators on simulated hardware.
pub struct SimBoard {
    /// Record of every line written
    pub trace: SimTrace,

    pub relays: SimRelayBank,

    /// The motor driver, of the kind given at construction
    pub driver: Box<dyn MotorDriver>,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Motor driver failure: {0}")]
    MotorDrv(#[from] MotorDrvError),

    #[error("Relay bank failure: {0}")]
    Relay(#[from] RelayError),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl SimBoard {
    pub fn new(kind: DriveKind) -> Self {
        let trace = SimTrace::new();

        Self {
            relays: sim_relay_bank(&trace),
            driver: sim_driver(&trace, kind),
            trace,
        }
    }

    /// Bring every actuator to its power-up safe state: all relays off, then motors braked.
    pub fn init(&mut self) -> Result<(), BoardError> {
        info!("Initialising {} board", self.driver.kind());

        self.relays.init()?;
        self.driver.init()?;

        Ok(())
    }

    /// A clock sharing the board's virtual time.
    pub fn clock(&self) -> SimClock {
        self.trace.clock()
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub fn sim_relay_bank(trace: &SimTrace) -> SimRelayBank {
    RelayBank::new(trace.bus("PORTD"), trace.pin("LATCH"), trace.clock())
}

pub fn sim_brushless(trace: &SimTrace) -> SimBrushless {
    let (port1, port2) = sim_ports(trace);
    BrushlessDriver::new(port1, port2, trace.pin("BL_R"), trace.clock())
}

pub fn sim_brush(trace: &SimTrace) -> SimBrush {
    let (port1, port2) = sim_ports(trace);
    BrushDriver::new(port1, port2)
}

/// A simulated driver of the given kind.
pub fn sim_driver(trace: &SimTrace, kind: DriveKind) -> Box<dyn MotorDriver> {
    match kind {
        DriveKind::Brushless => Box::new(sim_brushless(trace)),
        DriveKind::Brush => Box::new(sim_brush(trace)),
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn sim_ports(trace: &SimTrace) -> (PortLines<SimPin, SimPwm>, PortLines<SimPin, SimPwm>) {
    (
        PortLines::new(trace.pin("RUN1"), trace.pin("DIR1"), trace.pwm("PWM1")),
        PortLines::new(trace.pin("RUN2"), trace.pin("DIR2"), trace.pwm("PWM2")),
    )
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
