//! Worker subprocess spawning and reaping.
//!
//! Workers are re-invocations of the current executable with [`SPAWN_FLAG`]
//! appended, started through `std::process::Command` (`posix_spawn` where
//! available). Reaping goes through `waitpid(-1)`, so whichever worker exits
//! first is reported first.

use super::outcome::WorkerOutcome;
use super::signals::{TerminationReason, analyze_wait_status};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Argument that tells a re-invoked executable it is a worker.
pub const SPAWN_FLAG: &str = "--spawn";

/// A worker that has terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    pub pid: Pid,
    pub reason: TerminationReason,
}

impl Reaped {
    pub fn outcome(&self) -> WorkerOutcome {
        self.reason.outcome()
    }
}

/// Process layer the scheduler drives.
///
/// `launch` starts one worker; `wait_any` blocks until any launched worker
/// terminates.
pub trait WorkerLauncher {
    fn launch(&mut self) -> Result<Pid>;

    fn wait_any(&mut self) -> Result<Reaped>;
}

/// Program and arguments used to re-invoke this executable as a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The running executable with the arguments it was invoked with.
    pub fn current() -> Result<Self> {
        let program = std::env::current_exe().map_err(|e| {
            DaemonError::Spawn(format!("Failed to get current executable: {}", e))
        })?;
        Ok(Self::from_invocation(program, std::env::args_os().skip(1)))
    }

    /// Build from an explicit invocation, dropping any spawn flag already present.
    pub fn from_invocation<I>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args
                .into_iter()
                .map(Into::into)
                .filter(|a| a.as_os_str() != SPAWN_FLAG)
                .collect(),
        }
    }
}

/// Open a log file for appending, creating it if necessary.
///
/// Each worker gets its own handle so concurrent writers never share an offset.
pub fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| DaemonError::Spawn(format!("Failed to open {}: {}", path.display(), e)))
}

/// [`WorkerLauncher`] backed by real OS processes.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    command: WorkerCommand,
    output_log: PathBuf,
    error_log: PathBuf,
}

impl ProcessLauncher {
    pub fn new(command: WorkerCommand, config: &DaemonConfig) -> Self {
        Self {
            command,
            output_log: config.output_log.clone(),
            error_log: config.error_log.clone(),
        }
    }

    pub fn command(&self) -> &WorkerCommand {
        &self.command
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&mut self) -> Result<Pid> {
        let stdout = open_append(&self.output_log)?;
        let stderr = open_append(&self.error_log)?;

        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(SPAWN_FLAG)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| {
                DaemonError::Spawn(format!("{}: {}", self.command.program.display(), e))
            })?;

        // The `Child` handle is dropped here on purpose: reaping happens
        // through waitpid(-1) in `wait_any`, never through `Child::wait`.
        Ok(Pid::from_raw(child.id() as i32))
    }

    fn wait_any(&mut self) -> Result<Reaped> {
        loop {
            match waitpid(Pid::from_raw(-1), None) {
                Ok(status) => {
                    if let Some((pid, reason)) = analyze_wait_status(status) {
                        return Ok(Reaped { pid, reason });
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => return Err(DaemonError::NoChildren),
                Err(e) => return Err(DaemonError::Wait(e)),
            }
        }
    }
}
