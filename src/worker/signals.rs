//! Termination analysis for reaped workers.
//!
//! Turns a `WaitStatus` into a [`TerminationReason`] and from there into the
//! [`WorkerOutcome`] the throttle consumes.

use super::outcome::WorkerOutcome;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

/// Why a worker process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Normal exit with status code.
    Exited(i32),
    /// Killed by signal.
    Signaled(Signal),
}

impl TerminationReason {
    /// Map the termination onto the exit-code protocol.
    ///
    /// A worker killed by a signal never got to report, so it counts as failed.
    pub fn outcome(self) -> WorkerOutcome {
        match self {
            Self::Exited(code) => WorkerOutcome::from_exit_code(code),
            Self::Signaled(_) => WorkerOutcome::Failed,
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {}", code),
            Self::Signaled(sig) => write!(f, "killed by signal {:?}", sig),
        }
    }
}

/// Extract the terminated pid and its reason from a `WaitStatus`.
///
/// Returns `None` for statuses that do not mean the child is gone
/// (stopped, continued, still alive, ptrace events).
pub fn analyze_wait_status(status: WaitStatus) -> Option<(Pid, TerminationReason)> {
    match status {
        WaitStatus::Exited(pid, code) => Some((pid, TerminationReason::Exited(code))),
        WaitStatus::Signaled(pid, signal, _) => Some((pid, TerminationReason::Signaled(signal))),
        _ => None,
    }
}
