//! Command-line interface definitions using clap.

use clap::Parser;
use ebbd::config::{NULL_DEVICE, parse_seconds};
use ebbd::logging::{LogConfig, LogFormat};
use ebbd::worker::SPAWN_FLAG;
use ebbd::{DaemonConfig, ExecutionMode};
use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Background spool processor with adaptive worker concurrency.
#[derive(Parser, Debug)]
#[command(name = "ebbd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to take jobs from.
    #[arg(long, env = "EBBD_SPOOL_DIR")]
    pub spool_dir: PathBuf,

    /// Seconds each worker pauses after its unit of work.
    #[arg(long, env = "EBBD_QUIET_PERIOD", value_parser = parse_seconds, default_value = "1")]
    pub quiet_period: Duration,

    /// Seconds to wait after detaching before the first worker starts.
    #[arg(long, env = "EBBD_RAMP_UP", value_parser = parse_seconds, default_value = "0")]
    pub ramp_up: Duration,

    /// Maximum number of concurrent workers.
    #[arg(short = 'j', long, env = "EBBD_MAX_PARALLEL", default_value = "1")]
    pub max_parallel: NonZeroUsize,

    /// File that receives standard output once detached.
    #[arg(long, env = "EBBD_OUTPUT_LOG", default_value = NULL_DEVICE)]
    pub output_log: PathBuf,

    /// File that receives standard error once detached.
    #[arg(long, env = "EBBD_ERROR_LOG", default_value = NULL_DEVICE)]
    pub error_log: PathBuf,

    /// Directory to change into once detached (default: the executable's directory).
    #[arg(long, env = "EBBD_WORKING_DIR")]
    pub working_dir: Option<PathBuf>,

    /// Process a single job in the foreground instead of daemonizing.
    #[arg(long, conflicts_with = "spawn")]
    pub foreground: bool,

    /// Run as a worker of an already running supervisor.
    #[arg(long = "spawn", hide = true)]
    pub spawn: bool,

    /// Enable verbose logging (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format: pretty, compact, json.
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Additional log file (rotated daily).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// The execution mode this invocation was started in.
    pub fn mode(&self) -> ExecutionMode {
        if self.spawn {
            ExecutionMode::Spawn
        } else if self.foreground {
            ExecutionMode::Foreground
        } else {
            ExecutionMode::Supervise
        }
    }

    /// Make every path absolute so it survives the change of working directory.
    pub fn resolve_paths(&mut self) -> std::io::Result<()> {
        self.spool_dir = std::path::absolute(&self.spool_dir)?;
        self.output_log = std::path::absolute(&self.output_log)?;
        self.error_log = std::path::absolute(&self.error_log)?;
        if let Some(dir) = &self.working_dir {
            self.working_dir = Some(std::path::absolute(dir)?);
        }
        if let Some(file) = &self.log_file {
            self.log_file = Some(std::path::absolute(file)?);
        }
        Ok(())
    }

    pub fn daemon_config(&self) -> DaemonConfig {
        let config = DaemonConfig::new()
            .with_quiet_period(self.quiet_period)
            .with_ramp_up_time(self.ramp_up)
            .with_max_parallel(self.max_parallel)
            .with_output_log(&self.output_log)
            .with_error_log(&self.error_log);
        match &self.working_dir {
            Some(dir) => config.with_working_dir(dir),
            None => config,
        }
    }

    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::from_verbosity(self.verbose, self.quiet).with_env_overrides();
        if let Some(format) = self.log_format {
            config = config.with_format(format);
        }
        if let Some(file) = &self.log_file {
            config = config.with_file(file.clone());
        }
        config
    }

    /// Arguments that re-create this configuration in a worker.
    ///
    /// The spawn flag itself is appended by the launcher.
    pub fn worker_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--spool-dir".into(),
            self.spool_dir.clone().into(),
            "--quiet-period".into(),
            self.quiet_period.as_secs_f64().to_string().into(),
            "--output-log".into(),
            self.output_log.clone().into(),
            "--error-log".into(),
            self.error_log.clone().into(),
        ];
        if let Some(format) = self.log_format {
            args.push("--log-format".into());
            args.push(format.to_string().into());
        }
        if let Some(file) = &self.log_file {
            args.push("--log-file".into());
            args.push(file.clone().into());
        }
        if self.quiet {
            args.push("--quiet".into());
        }
        for _ in 0..self.verbose {
            args.push("--verbose".into());
        }
        debug_assert!(!args.iter().any(|a| a == SPAWN_FLAG));
        args
    }
}
