//! Implementations for the Teleop state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;

// Internal
use super::{
    adjust_speed, map_drive, map_ext, Params, TeleopError, TeleopPhase, NUM_LIMITS,
    NUM_TELEOP_EXT_CHANNELS,
};
use crate::ext_drv::ExtDrive;
use crate::loco_ctrl::{DriveDemand, Motion};
use hw_if::{Duty, GamepadState};
use util::{archive::Archiver, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Teleoperation module state
pub struct Teleop {
    params: Params,

    phase: TeleopPhase,

    /// Current speed as a duty value
    speed: u16,

    arch_output: Archiver,
}

/// Input data to Teleop.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputData {
    pub pad: GamepadState,

    /// Limit switch inputs, `true` once the limit is reached
    pub limits: [bool; NUM_LIMITS],
}

/// Demands Teleop makes of the locomotion layer and the external drivers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OutputData {
    pub drive: DriveDemand,

    /// Demands for external channels 1 and 2
    pub ext: [ExtDrive; NUM_TELEOP_EXT_CHANNELS],

    pub speed: Duty,

    pub phase: TeleopPhase,
}

/// Status report for Teleop processing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct StatusReport {
    /// The phase changed this cycle
    pub phase_changed: bool,

    /// The speed changed this cycle
    pub speed_changed: bool,
}

/// Flat version of the output for the CSV archive.
#[derive(Serialize)]
struct ArchRecord {
    time_s: f64,
    phase: TeleopPhase,
    motion: Option<Motion>,
    left_duty: u16,
    right_duty: u16,
    ext_1: ExtDrive,
    ext_2: ExtDrive,
    speed: u16,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Teleop {
    fn default() -> Self {
        let params = Params::default();

        Self {
            speed: params.default_speed,
            params,
            phase: TeleopPhase::WaitConnect,
            arch_output: Archiver::default(),
        }
    }
}

impl Teleop {
    /// Create a new teleop module with the given parameters and no archive.
    pub fn with_params(params: Params) -> Result<Self, TeleopError> {
        params.validate()?;

        Ok(Self {
            speed: params.default_speed,
            params,
            ..Self::default()
        })
    }

    pub fn phase(&self) -> TeleopPhase {
        self.phase
    }

    /// Advance the phase machine, returning the new phase.
    fn next_phase(&mut self, pad: &GamepadState) -> TeleopPhase {
        match self.phase {
            TeleopPhase::WaitConnect if pad.connected => TeleopPhase::WaitStart,
            TeleopPhase::WaitStart | TeleopPhase::Active if !pad.connected => {
                warn!("Controller disconnected");
                TeleopPhase::WaitConnect
            }
            TeleopPhase::WaitStart if pad.start => {
                info!("START pressed, manual control active (SELECT to exit)");
                self.speed = self.params.default_speed;
                TeleopPhase::Active
            }
            TeleopPhase::Active if pad.select => {
                info!("SELECT pressed, manual control ended");
                TeleopPhase::WaitSelectRelease
            }
            TeleopPhase::WaitSelectRelease if !pad.select => TeleopPhase::WaitConnect,
            phase => phase,
        }
    }

    fn archive(&mut self, output: &OutputData) {
        let (motion, left_duty, right_duty) = match output.drive {
            DriveDemand::Drive {
                motion,
                left,
                right,
            } => (Some(motion), left.get(), right.get()),
            DriveDemand::Stop => (None, 0, 0),
        };

        let record = ArchRecord {
            time_s: util::session::get_elapsed_seconds(),
            phase: output.phase,
            motion,
            left_duty,
            right_duty,
            ext_1: output.ext[0],
            ext_2: output.ext[1],
            speed: output.speed.get(),
        };

        if let Err(e) = self.arch_output.serialise(record) {
            warn!("Could not archive teleop output: {}", e);
        }
    }
}

impl State for Teleop {
    type InitData = &'static str;
    type InitError = TeleopError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = TeleopError;

    /// Initialise the Teleop module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: &Session,
    ) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data)?;
        params.validate()?;

        self.speed = params.default_speed;
        self.params = params;
        self.phase = TeleopPhase::WaitConnect;

        self.arch_output = Archiver::from_path(session, "teleop/output.csv")?;

        Ok(())
    }

    /// Perform cyclic processing of Teleop.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut report = StatusReport::default();
        let pad = &input_data.pad;

        let phase = self.next_phase(pad);
        if phase != self.phase {
            debug!("Teleop phase {:?} -> {:?}", self.phase, phase);
            report.phase_changed = true;
            self.phase = phase;
        }

        let (drive, ext) = match self.phase {
            TeleopPhase::Active => {
                let speed = adjust_speed(pad, self.speed, &self.params);
                if speed != self.speed {
                    trace!("Teleop speed {} -> {}", self.speed, speed);
                    report.speed_changed = true;
                    self.speed = speed;
                }

                (
                    map_drive(pad, Duty::saturating(self.speed), self.params.joy_deadband),
                    map_ext(pad, &input_data.limits),
                )
            }
            _ => (DriveDemand::Stop, [ExtDrive::Off; NUM_TELEOP_EXT_CHANNELS]),
        };

        let output = OutputData {
            drive,
            ext,
            speed: Duty::saturating(self.speed),
            phase: self.phase,
        };

        self.archive(&output);

        Ok((output, report))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
