//! `pointsman-cli` – runs the traffic-gesture program once.
//!
//! 1. Initialises logging (see `pointsman_runtime::telemetry`).
//! 2. Loads `~/.pointsman/config.toml`, writing the defaults on first run.
//! 3. Probes the arm controller once; an unreachable controller means a
//!    simulation-only session.
//! 4. Plays `Init`, `PriorityPeople` and `PriorityCars` and prints a summary.

mod config;

use std::process::ExitCode;

use colored::Colorize;
use tracing::{error, info, warn};

use pointsman_hal::{KinematicSim, SimulatedArm};
use pointsman_motion::{WaypointLibrary, standard_program};
use pointsman_runtime::{Session, SessionReport, init_tracing};
use pointsman_types::ArmError;

/// Robot name inside the simulation station.
const ROBOT_NAME: &str = "UR5e";

fn main() -> ExitCode {
    let guard = init_tracing("pointsman");
    if guard.is_exporting() {
        info!("exporting spans over OTLP");
    }

    print_banner();
    let cfg = load_config();

    println!(
        "  Probing controller at {} … ",
        format!("{}:{}", cfg.controller_address, cfg.controller_port).dimmed()
    );

    match run(&cfg) {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) if e.is_fatal() => {
            error!(error = %e, "session failed");
            println!("\n  {} {}", "✗ Session aborted:".red().bold(), e);
            ExitCode::FAILURE
        }
        Err(e) => {
            warn!(error = %e, "session ended early");
            println!("\n  {} {}", "⚠ Session ended early:".yellow().bold(), e);
            ExitCode::SUCCESS
        }
    }
}

fn run(cfg: &config::Config) -> Result<SessionReport, ArmError> {
    let library = WaypointLibrary::standard();
    let program = standard_program(&library)?;

    let simulator: Box<dyn SimulatedArm> =
        Box::new(KinematicSim::new(ROBOT_NAME).with_targets(library.names()));
    let mut session = Session::open(cfg.session_config(), Some(simulator))?;

    if session.capability().is_physical() {
        println!("  Controller {}", "online".green());
    } else {
        println!("  Controller {}", "offline".yellow());
        if let Some(reason) = session.probe_error() {
            println!("  {}", reason.to_string().dimmed());
        }
        println!(
            "  {}",
            "Running in simulation only. No physical motion will occur.".yellow()
        );
    }
    println!();

    let report = session.run(&program);
    session.close();
    report
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

fn load_config() -> config::Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("  {} {}",
        "pointsman".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Traffic-gesture arm dispatcher");
    println!();
}

fn print_summary(report: &SessionReport) {
    println!();
    println!("  {} session {}", "✓".green().bold(), report.session_id.to_string().dimmed());
    for routine in &report.routines {
        let physical = if routine.physical_skipped {
            "skipped".yellow().to_string()
        } else {
            format!(
                "{} commands, {:.0} s open-loop",
                routine.physical_commands,
                routine.open_loop.as_secs_f64()
            )
        };
        println!(
            "    • {:<16} sim {} moves | physical {}",
            routine.name.bold(),
            routine.simulated_moves,
            physical
        );
    }
    if !report.capability.is_physical() {
        println!();
        println!("  {}", "No physical motion occurred.".yellow().bold());
    }
    println!();
}
