//! Bookkeeping handle for an in-flight worker.

use nix::unistd::Pid;
use std::time::{Duration, Instant};

/// One spawned worker the scheduler is waiting on.
///
/// Only the pid and spawn time are tracked; the outcome arrives later
/// through `wait_any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerProcess {
    pid: Pid,
    spawned_at: Instant,
}

impl WorkerProcess {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            spawned_at: Instant::now(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn spawned_at(&self) -> Instant {
        self.spawned_at
    }

    /// How long the worker has been running.
    pub fn age(&self) -> Duration {
        self.spawned_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_process_tracks_pid_and_age() {
        let before = Instant::now();
        let worker = WorkerProcess::new(Pid::from_raw(4242));
        assert_eq!(worker.pid(), Pid::from_raw(4242));
        assert!(worker.spawned_at() >= before);

        std::thread::sleep(Duration::from_millis(5));
        assert!(worker.age() >= Duration::from_millis(5));
    }
}
