//! Adaptive worker-pool scheduling loop.
//!
//! The scheduler alternates between two phases:
//!
//! - **fill**: launch workers until `in_flight == target`;
//! - **drain**: wait for any worker to terminate, fold its outcome into the
//!   [`Throttle`], and keep waiting while `in_flight >= target`.
//!
//! It is single-threaded; `wait_any` is the only blocking call besides the
//! spawn-retry sleep.

use super::outcome::WorkerOutcome;
use super::proc::WorkerProcess;
use super::spawn::WorkerLauncher;
use super::throttle::Throttle;
use crate::config::DaemonConfig;
use crate::error::DaemonError;
use nix::unistd::Pid;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Runs workers through a [`WorkerLauncher`] and adapts how many run at once.
pub struct WorkerPoolScheduler<L> {
    launcher: L,
    throttle: Throttle,
    in_flight: HashMap<Pid, WorkerProcess>,
    retry_delay: Duration,
    cycles: u64,
}

impl<L: WorkerLauncher> WorkerPoolScheduler<L> {
    pub fn new(launcher: L, config: &DaemonConfig) -> Self {
        Self {
            launcher,
            throttle: Throttle::new(config.max_parallel),
            in_flight: HashMap::new(),
            retry_delay: config.spawn_retry_delay(),
            cycles: 0,
        }
    }

    /// Override the pause taken when nothing could be spawned.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn target_parallelism(&self) -> usize {
        self.throttle.target()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of completed fill/drain cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run fill/drain cycles forever.
    pub fn run_loop(&mut self) -> ! {
        info!(
            max_parallel = self.throttle.max(),
            "Starting worker pool scheduler"
        );
        loop {
            self.cycle();
        }
    }

    /// One fill phase followed by one drain phase.
    #[instrument(level = "trace", skip(self), fields(cycle = self.cycles))]
    pub fn cycle(&mut self) {
        self.fill();

        if self.in_flight.is_empty() {
            // Every launch failed; don't spin on the fill phase.
            debug!(
                delay_ms = self.retry_delay.as_millis(),
                "No workers in flight, retrying later"
            );
            std::thread::sleep(self.retry_delay);
        } else {
            self.drain();
        }

        self.cycles += 1;
    }

    fn fill(&mut self) {
        while self.in_flight.len() < self.throttle.target() {
            match self.launcher.launch() {
                Ok(pid) => {
                    debug!(
                        pid = pid.as_raw(),
                        in_flight = self.in_flight.len() + 1,
                        target = self.throttle.target(),
                        "Spawned worker"
                    );
                    self.in_flight.insert(pid, WorkerProcess::new(pid));
                }
                Err(e) => {
                    warn!(error = %e, "Could not spawn worker");
                    self.apply(WorkerOutcome::Failed);
                    break;
                }
            }
        }
    }

    fn drain(&mut self) {
        loop {
            match self.launcher.wait_any() {
                Ok(reaped) => match self.in_flight.remove(&reaped.pid) {
                    Some(worker) => {
                        let outcome = reaped.outcome();
                        debug!(
                            pid = reaped.pid.as_raw(),
                            reason = %reaped.reason,
                            outcome = %outcome,
                            runtime_ms = worker.age().as_millis(),
                            "Reaped worker"
                        );
                        self.apply(outcome);
                    }
                    None => {
                        warn!(
                            pid = reaped.pid.as_raw(),
                            reason = %reaped.reason,
                            "Reaped a process that is not a tracked worker"
                        );
                    }
                },
                Err(DaemonError::NoChildren) => {
                    warn!(
                        lost = self.in_flight.len(),
                        "No children left although workers were tracked"
                    );
                    self.in_flight.clear();
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Waiting for workers failed");
                    std::thread::sleep(self.retry_delay);
                    return;
                }
            }

            if self.in_flight.len() < self.throttle.target() {
                return;
            }
        }
    }

    fn apply(&mut self, outcome: WorkerOutcome) {
        let before = self.throttle.target();
        let after = self.throttle.record(outcome);
        if before != after {
            info!(
                outcome = %outcome,
                from = before,
                to = after,
                "Adjusted target parallelism"
            );
        }
    }
}
