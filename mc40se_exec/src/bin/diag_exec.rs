//! Diagnostics executable
//!
//! Runs one actuation sequence on the simulated board and saves its report, with the full record
//! of board writes, into the session directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::info;
use structopt::StructOpt;

// Internal
use hw_if::MotorPort;
use mc40se_lib::{
    board::SimBoard,
    diag::{self, DiagReport},
    motor_drv::DriveKind,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "diag_exec", about = "MC40SE actuation diagnostics")]
struct Opt {
    /// Log every board write
    #[structopt(short, long)]
    verbose: bool,

    #[structopt(subcommand)]
    cmd: DiagCmd,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A diagnostic sequence.
#[derive(Debug, StructOpt)]
enum DiagCmd {
    /// Ramp a brushless motor up clockwise, then down counter-clockwise, then brake.
    #[structopt(name = "brushless")]
    Brushless {
        /// The motor port to test, 1 or 2
        #[structopt(long, default_value = "1")]
        port: u8,
    },

    /// Ramp a brush motor up clockwise, then down counter-clockwise, then brake.
    #[structopt(name = "brush")]
    Brush {
        /// The motor port to test, 1 or 2
        #[structopt(long, default_value = "1")]
        port: u8,
    },

    /// Energize relays 1 to 4 in turn.
    #[structopt(name = "relays")]
    Relays {
        /// Number of full cycles
        #[structopt(long, default_value = "1")]
        cycles: usize,
    },

    /// Drive the external drivers on MD3 and MD4 each way in turn.
    #[structopt(name = "ext-drv")]
    ExtDrv {
        /// Number of full cycles
        #[structopt(long, default_value = "1")]
        cycles: usize,
    },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("diag_exec", "sessions").wrap_err("Failed to create the session")?;

    let level = match opt.verbose {
        true => LevelFilter::Trace,
        false => LevelFilter::Info,
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("MC40SE Diagnostics\n");
    info!("Running on: {}", host::describe());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- RUN SEQUENCE ----

    let kind = match opt.cmd {
        DiagCmd::Brush { .. } => DriveKind::Brush,
        _ => DriveKind::Brushless,
    };

    let mut board = SimBoard::new(kind);
    board.init().wrap_err("Failed to initialise the board")?;
    let mut clock = board.clock();

    let report: DiagReport = match opt.cmd {
        DiagCmd::Brushless { port } => {
            diag::brushless_test(board.driver.as_mut(), &mut clock, parse_port(port)?)
        }
        DiagCmd::Brush { port } => {
            diag::brush_test(board.driver.as_mut(), &mut clock, parse_port(port)?)
        }
        DiagCmd::Relays { cycles } => diag::relay_cycle(&mut board.relays, &mut clock, cycles),
        DiagCmd::ExtDrv { cycles } => {
            diag::ext_driver_cycle(&mut board.relays, &mut clock, cycles)
        }
    }
    .wrap_err("Diagnostic sequence failed")?;

    // ---- SHUTDOWN ----

    info!(
        "{}: {} steps, {} board writes over {} ms of board time",
        report.name,
        report.steps.len(),
        board.trace.len(),
        board.trace.now_ms()
    );

    session::save_with_timestamp("diag/report.json", report);
    session.save("diag/sim_trace.json", board.trace.events());

    info!("End of execution");

    session.exit();

    Ok(())
}

fn parse_port(port: u8) -> Result<MotorPort, Report> {
    match port {
        1 => Ok(MotorPort::Port1),
        2 => Ok(MotorPort::Port2),
        p => Err(eyre!("Motor port must be 1 or 2, found {}", p)),
    }
}
