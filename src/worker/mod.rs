//! Worker subprocess pool with adaptive concurrency.
//!
//! The supervisor keeps up to `target` workers alive. Every worker is a
//! re-invocation of the current executable in spawn mode that performs one
//! unit of work and reports the result through its exit status.
//!
//! # Architecture
//!
//! ```text
//!                     ┌──────────────────────┐
//!                     │  Supervisor process  │
//!                     │ (WorkerPoolScheduler)│
//!                     └──────────┬───────────┘
//!                     spawn ↓    │    ↑ waitpid(-1)
//!               ┌────────────────┼────────────────┐
//!               │                │                │
//!         ┌─────▼─────┐    ┌─────▼─────┐    ┌─────▼─────┐
//!         │ Worker 1  │    │ Worker 2  │    │ Worker N  │
//!         │ --spawn   │    │ --spawn   │    │ --spawn   │
//!         │ exit 42/0 │    │ exit 42/0 │    │ exit 42/0 │
//!         └───────────┘    └───────────┘    └───────────┘
//! ```
//!
//! - **Fill/drain loop**: [`WorkerPoolScheduler`]
//! - **Throttle rule**: [`Throttle`], did-work restores the maximum, idle or
//!   failed lowers the target by one
//! - **Exit-code protocol**: [`WorkerOutcome`]

mod outcome;
mod proc;
mod scheduler;
mod signals;
mod spawn;
mod throttle;

pub use outcome::{
    Activity, DID_WORK_EXIT_CODE, FAILED_EXIT_CODE, IDLE_EXIT_CODE, WorkerOutcome,
};
pub use proc::WorkerProcess;
pub use scheduler::WorkerPoolScheduler;
pub use signals::{TerminationReason, analyze_wait_status};
pub use spawn::{
    ProcessLauncher, Reaped, SPAWN_FLAG, WorkerCommand, WorkerLauncher, open_append,
};
pub use throttle::Throttle;
