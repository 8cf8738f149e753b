//! Implementations for the LocoCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;

// Internal
use super::{DriveDemand, GearPolarity, LocoCtrlError, Motion, Params};
use crate::motor_drv::MotorDriver;
use hw_if::{DriverOutputState, Duty, MotorPort, MotorStatus};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Locomotion control over one motor driver.
///
/// The left motor is on port 1 and the right motor on port 2.
pub struct LocoCtrl<M> {
    driver: M,

    polarity: GearPolarity,

    drive_state: DriveState,
}

/// Snapshot of the locomotion layer, suitable for archiving.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LocoStatus {
    pub drive_state: DriveState,
    pub left: DriverOutputState,
    pub right: DriverOutputState,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the drive was last told to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DriveState {
    /// Nothing commanded since power-up
    Idle,

    /// Both motors running in this motion
    Moving(Motion),

    /// Both motors braked
    Stopped,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<M: MotorDriver> LocoCtrl<M> {
    /// Create a new controller for the given driver and gear polarity.
    pub fn new(driver: M, polarity: GearPolarity) -> Self {
        Self {
            driver,
            polarity,
            drive_state: DriveState::Idle,
        }
    }

    /// Create a new controller from parameters, checking the driver matches the configured kind.
    pub fn from_params(driver: M, params: &Params) -> Result<Self, LocoCtrlError> {
        if driver.kind() != params.drive_kind {
            return Err(LocoCtrlError::DriveKindMismatch {
                expected: params.drive_kind,
                found: driver.kind(),
            });
        }

        Ok(Self::new(driver, params.gear_polarity))
    }

    pub fn forward(&mut self) -> Result<(), LocoCtrlError> {
        self.start(Motion::Forward)
    }

    pub fn reverse(&mut self) -> Result<(), LocoCtrlError> {
        self.start(Motion::Reverse)
    }

    pub fn pivot_left(&mut self) -> Result<(), LocoCtrlError> {
        self.start(Motion::PivotLeft)
    }

    pub fn pivot_right(&mut self) -> Result<(), LocoCtrlError> {
        self.start(Motion::PivotRight)
    }

    /// Set both motors running in the directions of `motion`. Duties are left as they are.
    pub fn start(&mut self, motion: Motion) -> Result<(), LocoCtrlError> {
        let (left, right) = motion.directions(self.polarity);

        debug!("LocoCtrl {:?}: left {:?}, right {:?}", motion, left, right);

        self.driver.drive(MotorPort::Port1, MotorStatus::Run, left)?;
        self.driver.drive(MotorPort::Port2, MotorStatus::Run, right)?;
        self.drive_state = DriveState::Moving(motion);

        Ok(())
    }

    /// Brake both motors.
    ///
    /// On brushless drivers this also issues the fault-reset pulse.
    pub fn stop(&mut self) -> Result<(), LocoCtrlError> {
        debug!("LocoCtrl stop");

        self.driver.brake_all()?;
        self.drive_state = DriveState::Stopped;

        Ok(())
    }

    /// Write the left and right duties without touching the directions.
    ///
    /// A direction must have been commanded since power-up, otherwise
    /// [`LocoCtrlError::NoActiveMotion`] is returned and nothing is written. After a stop the
    /// duties are written to the braked ports and take effect on the next motion.
    pub fn set_speed(&mut self, left: Duty, right: Duty) -> Result<(), LocoCtrlError> {
        if self.drive_state == DriveState::Idle {
            return Err(LocoCtrlError::NoActiveMotion);
        }

        trace!("LocoCtrl speed: left {}, right {}", left, right);

        self.driver.set_duty(MotorPort::Port1, left)?;
        self.driver.set_duty(MotorPort::Port2, right)?;

        Ok(())
    }

    /// Execute a drive demand.
    ///
    /// Lines are only rewritten when the motion changes, so repeating a demand each cycle only
    /// updates the duties. A stop is only issued if the drive is not already stopped.
    pub fn apply(&mut self, demand: &DriveDemand) -> Result<(), LocoCtrlError> {
        match *demand {
            DriveDemand::Drive {
                motion,
                left,
                right,
            } => {
                if self.drive_state != DriveState::Moving(motion) {
                    self.start(motion)?;
                }
                self.set_speed(left, right)
            }
            DriveDemand::Stop => match self.drive_state {
                DriveState::Stopped => Ok(()),
                _ => self.stop(),
            },
        }
    }

    pub fn drive_state(&self) -> DriveState {
        self.drive_state
    }

    pub fn polarity(&self) -> GearPolarity {
        self.polarity
    }

    pub fn status(&self) -> LocoStatus {
        LocoStatus {
            drive_state: self.drive_state,
            left: self.driver.output_state(MotorPort::Port1),
            right: self.driver.output_state(MotorPort::Port2),
        }
    }

    /// Release the driver.
    pub fn into_driver(self) -> M {
        self.driver
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
