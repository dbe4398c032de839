//! ebbd - drains a spool directory with an adaptive pool of worker processes.

mod cli;
mod spool;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use ebbd::logging;
use ebbd::{ConstraintSet, ForkDaemonizer, Supervisor, WorkerCommand};
use owo_colors::{OwoColorize, Stream::Stderr};
use spool::{SpoolDirConstraint, SpoolDrain};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut cli = Cli::parse();

    let result = cli
        .resolve_paths()
        .context("Failed to resolve configured paths")
        .and_then(|()| {
            logging::init(cli.log_config());
            run(&cli)
        });

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!(
                "{}: {}",
                "error"
                    .if_supports_color(Stderr, |text| text.red())
                    .if_supports_color(Stderr, |text| text.bold()),
                e
            );
            // Print the error chain if there are causes
            for cause in e.chain().skip(1) {
                eprintln!(
                    "  {}: {}",
                    "caused by".if_supports_color(Stderr, |text| text.yellow()),
                    cause
                );
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let mode = cli.mode();
    let config = cli.daemon_config();
    tracing::debug!(?mode, ?config, "Starting");

    let current = WorkerCommand::current()?;
    let command = WorkerCommand::from_invocation(current.program, cli.worker_args());
    let daemonizer = ForkDaemonizer::new(&command.program);

    let mut constraints = ConstraintSet::new();
    constraints.add(SpoolDirConstraint::new(&cli.spool_dir));

    let mut work = SpoolDrain::new(&cli.spool_dir);
    let code = Supervisor::new(config, constraints)
        .start(mode, &daemonizer, &mut work, command)
        .with_context(|| format!("ebbd stopped ({:?} mode)", mode))?;
    Ok(code)
}
