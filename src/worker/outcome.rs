//! Worker outcomes and the exit-code protocol.
//!
//! A worker reports what it did through its exit status only:
//!
//! | exit status      | outcome   |
//! |------------------|-----------|
//! | 42               | `DidWork` |
//! | 0                | `Idle`    |
//! | anything else    | `Failed`  |

use std::fmt;
use std::process::ExitCode;

/// Exit status a worker uses to say it found and processed something.
pub const DID_WORK_EXIT_CODE: u8 = 42;

/// Exit status a worker uses to say it found nothing to do.
pub const IDLE_EXIT_CODE: u8 = 0;

/// Exit status for a work unit that returned an error.
pub const FAILED_EXIT_CODE: u8 = 1;

/// What a unit of work reports back to the worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Something was found and processed.
    DidWork,
    /// Ran, but there was nothing to do.
    Idle,
}

/// Result of one worker as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    DidWork,
    Idle,
    /// Abnormal termination: unexpected exit status or death by signal.
    Failed,
}

impl WorkerOutcome {
    /// Decode an exit status reported by `waitpid`.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            c if c == i32::from(DID_WORK_EXIT_CODE) => Self::DidWork,
            c if c == i32::from(IDLE_EXIT_CODE) => Self::Idle,
            _ => Self::Failed,
        }
    }

    /// Exit status a worker process should terminate with.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::DidWork => DID_WORK_EXIT_CODE,
            Self::Idle => IDLE_EXIT_CODE,
            Self::Failed => FAILED_EXIT_CODE,
        }
    }

    pub fn did_work(self) -> bool {
        self == Self::DidWork
    }
}

impl From<Activity> for WorkerOutcome {
    fn from(activity: Activity) -> Self {
        match activity {
            Activity::DidWork => Self::DidWork,
            Activity::Idle => Self::Idle,
        }
    }
}

impl From<WorkerOutcome> for ExitCode {
    fn from(outcome: WorkerOutcome) -> Self {
        ExitCode::from(outcome.exit_code())
    }
}

impl fmt::Display for WorkerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DidWork => write!(f, "did-work"),
            Self::Idle => write!(f, "idle"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_protocol() {
        assert_eq!(WorkerOutcome::from_exit_code(42), WorkerOutcome::DidWork);
        assert_eq!(WorkerOutcome::from_exit_code(0), WorkerOutcome::Idle);
        assert_eq!(WorkerOutcome::from_exit_code(1), WorkerOutcome::Failed);
        assert_eq!(WorkerOutcome::from_exit_code(101), WorkerOutcome::Failed);
        assert_eq!(WorkerOutcome::from_exit_code(-1), WorkerOutcome::Failed);
    }

    #[test]
    fn test_outcome_exit_codes_decode_to_themselves() {
        for outcome in [
            WorkerOutcome::DidWork,
            WorkerOutcome::Idle,
            WorkerOutcome::Failed,
        ] {
            let code = i32::from(outcome.exit_code());
            assert_eq!(WorkerOutcome::from_exit_code(code), outcome);
        }
    }

    #[test]
    fn test_activity_conversion() {
        assert_eq!(WorkerOutcome::from(Activity::DidWork), WorkerOutcome::DidWork);
        assert_eq!(WorkerOutcome::from(Activity::Idle), WorkerOutcome::Idle);
        assert!(WorkerOutcome::DidWork.did_work());
        assert!(!WorkerOutcome::Failed.did_work());
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkerOutcome::DidWork.to_string(), "did-work");
        assert_eq!(WorkerOutcome::Idle.to_string(), "idle");
        assert_eq!(WorkerOutcome::Failed.to_string(), "failed");
    }
}
