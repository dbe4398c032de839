//! ebbd - adaptive background worker supervisor.
//!
//! Detaches from the terminal, then keeps re-invoking the current executable
//! as worker processes. Each worker runs one [`WorkUnit`] and reports through
//! its exit status whether it did real work; the scheduler uses that to grow
//! or shrink the number of concurrent workers.
//!
//! ```no_run
//! use ebbd::{
//!     Activity, ConstraintSet, DaemonConfig, ExecutionMode, ForkDaemonizer, Supervisor,
//!     WorkerCommand,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let command = WorkerCommand::current()?;
//! let mode = if std::env::args().any(|a| a == ebbd::worker::SPAWN_FLAG) {
//!     ExecutionMode::Spawn
//! } else {
//!     ExecutionMode::Supervise
//! };
//! let daemonizer = ForkDaemonizer::new(&command.program);
//! let mut work = || -> anyhow::Result<Activity> { Ok(Activity::Idle) };
//!
//! let supervisor = Supervisor::new(DaemonConfig::default(), ConstraintSet::new());
//! let code = supervisor.start(mode, &daemonizer, &mut work, command)?;
//! # let _ = code;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constraint;
pub mod daemonize;
pub mod error;
pub mod logging;
pub mod supervisor;
pub mod worker;

pub use config::DaemonConfig;
pub use constraint::{Constraint, ConstraintContext, ConstraintSet};
pub use daemonize::{Daemonizer, ForkDaemonizer};
pub use error::{DaemonError, Result};
pub use supervisor::{ExecutionMode, Supervisor, WorkUnit};
pub use worker::{Activity, WorkerCommand, WorkerOutcome, WorkerPoolScheduler};
