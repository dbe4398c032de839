//! Daemon configuration.
//!
//! A [`DaemonConfig`] is built once by the embedding application and is
//! read-only from the moment the supervisor starts.

use crate::error::{DaemonError, Result};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Discard sink used for both log streams unless configured otherwise.
pub const NULL_DEVICE: &str = "/dev/null";

/// Default pause a worker takes after finishing its unit of work.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(1);

/// Configuration shared by the supervisor, the scheduler and every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Sleep after each unit of work, before the worker exits.
    pub quiet_period: Duration,
    /// One-time delay between detachment and the first spawn.
    pub ramp_up_time: Duration,
    /// Upper bound on concurrently running workers.
    pub max_parallel: NonZeroUsize,
    /// Append target for standard output after detachment.
    pub output_log: PathBuf,
    /// Append target for standard error after detachment.
    pub error_log: PathBuf,
    /// Directory the daemon changes into (None = executable's directory).
    pub working_dir: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            ramp_up_time: Duration::ZERO,
            max_parallel: NonZeroUsize::MIN,
            output_log: PathBuf::from(NULL_DEVICE),
            error_log: PathBuf::from(NULL_DEVICE),
            working_dir: None,
        }
    }
}

impl DaemonConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    pub fn with_ramp_up_time(mut self, ramp_up_time: Duration) -> Self {
        self.ramp_up_time = ramp_up_time;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: NonZeroUsize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn with_output_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_log = path.into();
        self
    }

    pub fn with_error_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_log = path.into();
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// Directory to change into after detachment.
    ///
    /// Falls back to the directory holding `program`, then to `/`.
    pub fn anchor_dir(&self, program: &Path) -> PathBuf {
        if let Some(dir) = &self.working_dir {
            return dir.clone();
        }
        program
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"))
    }

    /// Delay before the scheduler retries after it could not spawn anything.
    pub fn spawn_retry_delay(&self) -> Duration {
        self.quiet_period.max(Duration::from_secs(1))
    }
}

/// Parse a non-negative, float-precision number of seconds.
///
/// Usable directly as a clap `value_parser`.
pub fn parse_seconds(s: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", s))?;
    seconds_to_duration(secs).map_err(|e| e.to_string())
}

/// Convert float seconds into a `Duration`, rejecting negative and non-finite input.
pub fn seconds_to_duration(secs: f64) -> Result<Duration> {
    if !secs.is_finite() {
        return Err(DaemonError::InvalidConfig(format!(
            "duration must be finite, got {}",
            secs
        )));
    }
    if secs < 0.0 {
        return Err(DaemonError::InvalidConfig(format!(
            "duration must not be negative, got {}",
            secs
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.quiet_period, Duration::from_secs(1));
        assert_eq!(config.ramp_up_time, Duration::ZERO);
        assert_eq!(config.max_parallel.get(), 1);
        assert_eq!(config.output_log, PathBuf::from("/dev/null"));
        assert_eq!(config.error_log, PathBuf::from("/dev/null"));
        assert!(config.working_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let config = DaemonConfig::new()
            .with_quiet_period(Duration::from_millis(250))
            .with_ramp_up_time(Duration::from_secs(3))
            .with_max_parallel(NonZeroUsize::new(8).unwrap())
            .with_output_log("/var/log/ebbd.out")
            .with_error_log("/var/log/ebbd.err")
            .with_working_dir("/srv");

        assert_eq!(config.quiet_period, Duration::from_millis(250));
        assert_eq!(config.ramp_up_time, Duration::from_secs(3));
        assert_eq!(config.max_parallel.get(), 8);
        assert_eq!(config.output_log, PathBuf::from("/var/log/ebbd.out"));
        assert_eq!(config.error_log, PathBuf::from("/var/log/ebbd.err"));
        assert_eq!(config.working_dir, Some(PathBuf::from("/srv")));
    }

    #[test]
    fn test_anchor_dir() {
        let config = DaemonConfig::default();
        assert_eq!(
            config.anchor_dir(Path::new("/usr/local/bin/ebbd")),
            PathBuf::from("/usr/local/bin")
        );
        assert_eq!(config.anchor_dir(Path::new("ebbd")), PathBuf::from("/"));

        let config = config.with_working_dir("/srv/spool");
        assert_eq!(
            config.anchor_dir(Path::new("/usr/local/bin/ebbd")),
            PathBuf::from("/srv/spool")
        );
    }

    #[test]
    fn test_spawn_retry_delay_has_floor() {
        let config = DaemonConfig::default().with_quiet_period(Duration::ZERO);
        assert_eq!(config.spawn_retry_delay(), Duration::from_secs(1));

        let config = config.with_quiet_period(Duration::from_secs(5));
        assert_eq!(config.spawn_retry_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("2.5").unwrap(), Duration::from_millis(2500));
        assert_eq!(parse_seconds("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_seconds(" 1 ").unwrap(), Duration::from_secs(1));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
        assert!(parse_seconds("inf").is_err());
        assert!(parse_seconds("NaN").is_err());
    }
}
