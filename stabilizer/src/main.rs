//! Stabilization control loop CLI.
//!
//! Drives an autonomous code-editing agent through scan, plan, execute, and
//! verify phases until the project's build and test commands pass.
//! Instructions for the actor are printed to stdout; operator notices go to
//! stderr.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use stabilizer::exit_codes;
use stabilizer::io::console::{Console, NotifyLevel, StderrConsole};
use stabilizer::io::exec::SystemExec;
use stabilizer::io::layout::ControlPaths;
use stabilizer::io::messenger::StdoutMessenger;
use stabilizer::io::state::{load_or_default, write_run_state};
use stabilizer::resume::{ResumeOutcome, resume_run};
use stabilizer::start::start_run;
use stabilizer::status::status_line;
use stabilizer::tick::{TickOptions, TickOutcome, tick};

#[derive(Parser)]
#[command(
    name = "stabilizer",
    version,
    about = "Drives an autonomous code-editing agent until build and tests pass"
)]
struct Cli {
    /// Project root to operate on.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the project, measure the error baseline, and request a plan.
    Start {
        /// Restart without asking when a run is already active.
        #[arg(short, long)]
        force: bool,
    },
    /// Advance the state machine by one controller invocation.
    Tick {
        /// The actor's last turn was interrupted by the operator.
        #[arg(long)]
        interrupted: bool,
    },
    /// Re-emit the instruction for the current phase and step.
    Resume,
    /// Print the current run status.
    Status,
    /// Mark the active run as stopped.
    Abort,
}

fn main() {
    stabilizer::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Start { force } => cmd_start(&cli.root, force),
        Command::Tick { interrupted } => cmd_tick(&cli.root, interrupted),
        Command::Resume => cmd_resume(&cli.root),
        Command::Status => cmd_status(&cli.root),
        Command::Abort => cmd_abort(&cli.root),
    }
}

fn cmd_start(root: &Path, force: bool) -> Result<i32> {
    let console = StderrConsole::new(force);
    start_run(root, &SystemExec, &StdoutMessenger, &console)?;
    Ok(exit_codes::OK)
}

fn cmd_tick(root: &Path, interrupted: bool) -> Result<i32> {
    let console = StderrConsole::new(false);
    let outcome = tick(
        root,
        &SystemExec,
        &StdoutMessenger,
        &console,
        &TickOptions { interrupted },
    )?;
    Ok(match outcome {
        TickOutcome::Idle => exit_codes::IDLE,
        TickOutcome::Stopped | TickOutcome::Escalated { .. } => exit_codes::STOPPED,
        TickOutcome::Advanced { .. } | TickOutcome::AwaitingTriage | TickOutcome::Finished => {
            exit_codes::OK
        }
    })
}

fn cmd_resume(root: &Path) -> Result<i32> {
    match resume_run(root, &StdoutMessenger)? {
        ResumeOutcome::Idle => Ok(exit_codes::IDLE),
        ResumeOutcome::Reissued { .. } | ResumeOutcome::AwaitingTriage => Ok(exit_codes::OK),
    }
}

fn cmd_status(root: &Path) -> Result<i32> {
    let paths = ControlPaths::new(root);
    let state = load_or_default(&paths.state_path)?;
    match status_line(&state) {
        Some(line) => {
            println!("{line}");
            Ok(exit_codes::OK)
        }
        None => {
            println!("no active stabilization run");
            Ok(exit_codes::IDLE)
        }
    }
}

fn cmd_abort(root: &Path) -> Result<i32> {
    let console = StderrConsole::new(false);
    let paths = ControlPaths::new(root);
    let mut state = load_or_default(&paths.state_path)?;
    if !state.active {
        console.notify("No active stabilization run.", NotifyLevel::Info);
        return Ok(exit_codes::IDLE);
    }
    state.active = false;
    write_run_state(&paths.state_path, &state)?;
    console.notify("Stabilization run aborted.", NotifyLevel::Info);
    Ok(exit_codes::STOPPED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_start() {
        let cli = Cli::parse_from(["stabilizer", "start"]);
        assert!(matches!(cli.command, Command::Start { force: false }));
    }

    #[test]
    fn parse_start_force() {
        let cli = Cli::parse_from(["stabilizer", "start", "--force"]);
        assert!(matches!(cli.command, Command::Start { force: true }));
    }

    #[test]
    fn parse_tick_interrupted() {
        let cli = Cli::parse_from(["stabilizer", "tick", "--interrupted"]);
        assert!(matches!(cli.command, Command::Tick { interrupted: true }));
    }

    #[test]
    fn parse_root_override() {
        let cli = Cli::parse_from(["stabilizer", "--root", "/tmp/project", "status"]);
        assert_eq!(cli.root, PathBuf::from("/tmp/project"));
    }
}
