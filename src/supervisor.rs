//! Startup sequencing.
//!
//! [`Supervisor::start`] checks constraints, then either runs one unit of
//! work (spawn/foreground mode) or detaches, waits the ramp-up time and
//! hands over to the [`WorkerPoolScheduler`] for good.

use crate::config::DaemonConfig;
use crate::constraint::{ConstraintContext, ConstraintSet};
use crate::daemonize::Daemonizer;
use crate::error::Result;
use crate::worker::{Activity, ProcessLauncher, WorkerCommand, WorkerOutcome, WorkerPoolScheduler};
use std::process::ExitCode;
use std::time::Instant;

/// The unit of work an embedding application supplies.
///
/// Runs inside a worker process. Returning `Err` (or panicking) makes the
/// worker count as failed.
pub trait WorkUnit {
    fn run(&mut self) -> anyhow::Result<Activity>;
}

impl<F> WorkUnit for F
where
    F: FnMut() -> anyhow::Result<Activity>,
{
    fn run(&mut self) -> anyhow::Result<Activity> {
        self()
    }
}

/// How this invocation of the executable should behave.
///
/// Decided once by the entry point and passed in explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Detach and run the worker pool.
    Supervise,
    /// This process is a worker spawned by a supervisor.
    Spawn,
    /// Run a single unit of work attached to the terminal.
    Foreground,
}

impl ExecutionMode {
    pub fn is_worker(self) -> bool {
        matches!(self, Self::Spawn | Self::Foreground)
    }
}

/// Composes constraints, detachment and the scheduler.
#[derive(Debug)]
pub struct Supervisor {
    config: DaemonConfig,
    constraints: ConstraintSet,
}

impl Supervisor {
    pub fn new(config: DaemonConfig, constraints: ConstraintSet) -> Self {
        Self {
            config,
            constraints,
        }
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Run this invocation to completion.
    ///
    /// Worker modes return the exit code encoding the outcome. Supervise mode
    /// only returns on a startup error; otherwise the scheduler runs until the
    /// process is killed.
    pub fn start<D, W>(
        self,
        mode: ExecutionMode,
        daemonizer: &D,
        work: &mut W,
        command: WorkerCommand,
    ) -> Result<ExitCode>
    where
        D: Daemonizer + ?Sized,
        W: WorkUnit + ?Sized,
    {
        self.check_constraints(mode)?;

        if mode.is_worker() {
            return Ok(self.run_worker(work).into());
        }

        self.enter_background(daemonizer)?;
        let launcher = ProcessLauncher::new(command, &self.config);
        WorkerPoolScheduler::new(launcher, &self.config).run_loop()
    }

    /// Evaluate every constraint for `mode`, stopping at the first failure.
    pub fn check_constraints(&self, mode: ExecutionMode) -> Result<()> {
        let ctx = ConstraintContext {
            config: &self.config,
            mode,
        };
        self.constraints.check_all(&ctx)
    }

    /// Run one unit of work, then sit out the quiet period.
    pub fn run_worker<W: WorkUnit + ?Sized>(&self, work: &mut W) -> WorkerOutcome {
        let started = Instant::now();
        let outcome = match work.run() {
            Ok(activity) => WorkerOutcome::from(activity),
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "Unit of work failed");
                WorkerOutcome::Failed
            }
        };
        tracing::debug!(
            outcome = %outcome,
            elapsed_ms = started.elapsed().as_millis(),
            quiet_period_ms = self.config.quiet_period.as_millis(),
            "Unit of work finished"
        );

        std::thread::sleep(self.config.quiet_period);
        outcome
    }

    /// Detach and wait out the ramp-up time.
    pub fn enter_background<D: Daemonizer + ?Sized>(&self, daemonizer: &D) -> Result<()> {
        daemonizer.detach(&self.config)?;

        if !self.config.ramp_up_time.is_zero() {
            tracing::info!(
                ramp_up_ms = self.config.ramp_up_time.as_millis(),
                "Waiting for ramp-up time"
            );
            std::thread::sleep(self.config.ramp_up_time);
        }
        Ok(())
    }
}
