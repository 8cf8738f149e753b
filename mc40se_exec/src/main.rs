//! Manual teleoperation executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Bring the board to its power-up safe state
//!     - Main loop:
//!         - Gamepad acquisition (from a timed script)
//!         - Teleop processing
//!         - Locomotion and external driver execution
//!     - Stop the drive and clear the relays
//!
//! # Modules
//!
//! All cyclic modules (e.g. `teleop`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::fmt::Display;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use hw_if::{ExtChannel, Gamepad};
use mc40se_lib::{
    board::{SimBoard, SimRelayBank},
    ext_drv::ExtDrivers,
    loco_ctrl::{self, LocoCtrl},
    motor_drv::MotorDriver,
    teleop::{self, Teleop, NUM_LIMITS},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::ScriptInterpreter,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.05;

/// Script used when none is given, relative to the software root.
const DEFAULT_SCRIPT: &str = "scripts/manual_demo.txt";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "mc40se_exec", about = "MC40SE manual teleoperation demo")]
struct Opt {
    /// Gamepad script to replay, defaults to the manual demo script
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("mc40se_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("MC40SE Manual Demo\n");
    info!("Running on: {}", host::describe());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let loco_params: loco_ctrl::Params =
        util::params::load("loco_ctrl.toml").wrap_err("Could not load LocoCtrl params")?;

    info!(
        "Exec parameters loaded: {:?} gears, {} driver",
        loco_params.gear_polarity, loco_params.drive_kind
    );

    // ---- INITIALISE GAMEPAD SOURCE ----

    let script_path = match opt.script {
        Some(p) => p,
        None => host::get_sw_root()
            .wrap_err("Could not find the default script")?
            .join(DEFAULT_SCRIPT),
    };

    info!("Loading script from {:?}", script_path);

    let mut gamepad = ScriptInterpreter::new(&script_path).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} entries\n",
        gamepad.get_duration(),
        gamepad.get_num_entries()
    );

    // ---- INITIALISE BOARD ----

    let mut board = SimBoard::new(loco_params.drive_kind);
    board.init().wrap_err("Failed to initialise the board")?;

    let SimBoard {
        trace,
        mut relays,
        driver,
    } = board;

    let mut loco =
        LocoCtrl::from_params(driver, &loco_params).wrap_err("Failed to initialise LocoCtrl")?;

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut teleop = Teleop::default();
    teleop
        .init("teleop.toml", &session)
        .wrap_err("Failed to initialise Teleop")?;
    info!("Teleop init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(CYCLE_PERIOD_S);
    let mut num_cycles: u64 = 0;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        let finished = run_cycle(&mut gamepad, &mut teleop, &mut loco, &mut relays)?;

        num_cycles += 1;

        if finished {
            info!("End of gamepad script reached, stopping");
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;
        trace.advance(cycle_dur.max(cycle_period).as_millis() as u64);

        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }
    }

    // ---- SHUTDOWN ----

    loco.stop().wrap_err("Failed to stop the drive")?;
    relays.all_off().wrap_err("Failed to clear the relays")?;

    info!(
        "Ran {} cycles, {} board writes over {} ms of board time",
        num_cycles,
        trace.len(),
        trace.now_ms()
    );

    session.save("loco_status.json", loco.status());
    session.save("sim_trace.json", trace.events());

    info!("End of execution");

    session.exit();

    Ok(())
}

/// Read the gamepad, process teleop and actuate the drive and external drivers.
///
/// A teleop failure is logged and nothing is actuated, the outputs keep their last demand. Returns
/// `true` once the gamepad script has been consumed.
fn run_cycle<T, M>(
    gamepad: &mut ScriptInterpreter,
    teleop: &mut T,
    loco: &mut LocoCtrl<M>,
    relays: &mut SimRelayBank,
) -> Result<bool, Report>
where
    T: State<
        InputData = teleop::InputData,
        OutputData = teleop::OutputData,
        StatusReport = teleop::StatusReport,
    >,
    T::ProcError: Display,
    M: MotorDriver,
{
    // ---- DATA INPUT ----

    let pad = match gamepad.read() {
        Ok(p) => p,
        Err(e) => match e {},
    };

    let input = teleop::InputData {
        pad,
        // The simulated board has nothing on the sensor inputs
        limits: [false; NUM_LIMITS],
    };

    // ---- CONTROL ALGORITHM PROCESSING ----

    let output = match teleop.proc(&input) {
        Ok((o, r)) => {
            if r.phase_changed {
                info!("Teleop phase: {:?}", o.phase);
            }
            if r.speed_changed {
                debug!("Teleop speed: {}", o.speed);
            }
            Some(o)
        }
        Err(e) => {
            warn!("Error during Teleop processing: {}", e);
            None
        }
    };

    // ---- ACTUATION ----

    if let Some(output) = output {
        if let Err(e) = loco.apply(&output.drive) {
            warn!("Error during LocoCtrl execution: {}", e);
        }

        let mut ext = ExtDrivers::new(relays);
        for (i, demand) in output.ext.iter().enumerate() {
            let channel = ExtChannel::new(i as u8 + 1).wrap_err("Invalid external channel")?;

            if let Err(e) = ext.drive(channel, *demand) {
                warn!("Error driving {}: {}", channel, e);
            }
        }
    }

    Ok(gamepad.is_finished())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
