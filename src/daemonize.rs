//! Detaching from the invoking terminal session.
//!
//! [`ForkDaemonizer`] runs the classic sequence exactly once: fork (the
//! parent exits 0), clear the umask, become a session leader, change into
//! the anchor directory, and reopen stdin/stdout/stderr on `/dev/null` and
//! the configured log files.

use crate::config::{DaemonConfig, NULL_DEVICE};
use crate::error::{DaemonError, Result};
use crate::worker::open_append;
use nix::libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::stat::{Mode, umask};
use nix::unistd::{ForkResult, chdir, dup2, fork, setsid};
use std::fs::File;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

/// Performs the one-time OS detachment before the scheduler starts.
pub trait Daemonizer {
    /// Detach the calling process.
    ///
    /// Returns in the detached process only; the invoking process is gone
    /// by the time this returns `Ok`.
    ///
    /// Implementations may fork, so call this from a single-threaded process:
    /// before any thread is started, including the worker thread of a
    /// `tracing_appender::non_blocking` writer.
    fn detach(&self, config: &DaemonConfig) -> Result<()>;
}

/// Where the standard streams and the working directory end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachPlan {
    pub working_dir: PathBuf,
    pub stdin: PathBuf,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

impl DetachPlan {
    pub fn new(config: &DaemonConfig, program: &Path) -> Self {
        Self {
            working_dir: config.anchor_dir(program),
            stdin: PathBuf::from(NULL_DEVICE),
            stdout: config.output_log.clone(),
            stderr: config.error_log.clone(),
        }
    }
}

/// fork/setsid based [`Daemonizer`].
///
/// # Threads
///
/// [`detach`](Daemonizer::detach) forks, and only the calling thread
/// survives in the child. It must run before the process starts any other
/// thread. In particular, set up logging with blocking writers only (as
/// [`crate::logging::init`] does); a `tracing_appender::non_blocking`
/// guard created before detaching would lose its worker thread and stall
/// every log call in the daemon.
#[derive(Debug, Clone)]
pub struct ForkDaemonizer {
    program: PathBuf,
}

impl ForkDaemonizer {
    /// `program` is the executable being daemonized; its directory is the
    /// default anchor.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Daemonizer for ForkDaemonizer {
    fn detach(&self, config: &DaemonConfig) -> Result<()> {
        let plan = DetachPlan::new(config, &self.program);

        // Safety: the caller guarantees no other thread exists (see type docs);
        // the child only continues with plain syscalls.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => {
                tracing::debug!(pid = child.as_raw(), "Detached, parent exiting");
                std::process::exit(0);
            }
            Ok(ForkResult::Child) => {}
            Err(e) => return Err(DaemonError::Detachment(format!("fork: {}", e))),
        }

        umask(Mode::empty());

        let sid = setsid()
            .map_err(|e| DaemonError::Detachment(format!("could not detach session id: {}", e)))?;

        if let Err(e) = chdir(&plan.working_dir) {
            tracing::warn!(
                dir = %plan.working_dir.display(),
                error = %e,
                "Could not change working directory"
            );
        }

        reopen_std_streams(&plan)?;

        tracing::info!(
            pid = std::process::id(),
            sid = sid.as_raw(),
            "Daemon detached"
        );
        Ok(())
    }
}

/// Point fd 0/1/2 at the plan's targets.
fn reopen_std_streams(plan: &DetachPlan) -> Result<()> {
    let stdin = File::open(&plan.stdin)?;
    let stdout = open_append(&plan.stdout)?;
    let stderr = open_append(&plan.stderr)?;

    redirect(&stdin, STDIN_FILENO)?;
    redirect(&stdout, STDOUT_FILENO)?;
    redirect(&stderr, STDERR_FILENO)?;
    // The originals close on drop; fd 0/1/2 keep their own duplicates.
    Ok(())
}

fn redirect(file: &File, target: RawFd) -> Result<()> {
    dup2(file.as_raw_fd(), target)
        .map(|_| ())
        .map_err(|e| DaemonError::Detachment(format!("dup2 onto fd {}: {}", target, e)))
}
