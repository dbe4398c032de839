//! Spool-directory work unit used by the `ebbd` binary.
//!
//! Every regular, non-hidden file dropped into the spool directory is one
//! job. A worker claims the oldest job by renaming it into `.claimed/`
//! (atomic within one filesystem, so two workers never process the same
//! file), reports its size and line count on stdout, and moves it to `done/`.

use anyhow::{Context, Result};
use ebbd::{Activity, Constraint, ConstraintContext, WorkUnit};
use nix::unistd::{AccessFlags, access};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const CLAIMED_DIR: &str = ".claimed";
const DONE_DIR: &str = "done";

/// Processes at most one spooled job per run.
#[derive(Debug, Clone)]
pub struct SpoolDrain {
    spool_dir: PathBuf,
}

impl SpoolDrain {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
        }
    }

    /// Pending job files, oldest name first.
    fn pending(&self) -> Result<Vec<PathBuf>> {
        let mut jobs = Vec::new();
        let entries = fs::read_dir(&self.spool_dir)
            .with_context(|| format!("Failed to read {}", self.spool_dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && entry.file_type()?.is_file() {
                jobs.push(entry.path());
            }
        }
        jobs.sort();
        Ok(jobs)
    }

    /// Move `job` into the claim directory; `None` if another worker got it first.
    fn claim(&self, job: &Path) -> Result<Option<PathBuf>> {
        let claimed_dir = self.spool_dir.join(CLAIMED_DIR);
        fs::create_dir_all(&claimed_dir)?;

        let Some(name) = job.file_name() else {
            return Ok(None);
        };
        let mut claimed_name = name.to_os_string();
        claimed_name.push(format!(".{}", std::process::id()));
        let claimed = claimed_dir.join(claimed_name);

        match fs::rename(job, &claimed) {
            Ok(()) => Ok(Some(claimed)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to claim {}", job.display())),
        }
    }

    /// Put a claimed job back so a later run picks it up again.
    fn release(&self, job: &Path, claimed: &Path) {
        if let Err(e) = fs::rename(claimed, job) {
            tracing::warn!(
                job = %job.display(),
                claimed = %claimed.display(),
                error = %e,
                "Could not return job to the spool"
            );
        }
    }

    fn process(&self, original: &Path, claimed: &Path) -> Result<()> {
        let contents = fs::read(claimed)
            .with_context(|| format!("Failed to read {}", claimed.display()))?;
        let lines = contents.iter().filter(|&&b| b == b'\n').count();

        let name = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut stdout = io::stdout().lock();
        writeln!(
            stdout,
            "processed {}: {} bytes, {} lines",
            name,
            contents.len(),
            lines
        )?;
        stdout.flush()?;

        let done_dir = self.spool_dir.join(DONE_DIR);
        fs::create_dir_all(&done_dir)?;
        fs::rename(claimed, done_dir.join(&name))
            .with_context(|| format!("Failed to move {} to {}", name, done_dir.display()))?;

        tracing::debug!(job = %name, bytes = contents.len(), lines, "Processed job");
        Ok(())
    }
}

impl WorkUnit for SpoolDrain {
    fn run(&mut self) -> anyhow::Result<Activity> {
        for job in self.pending()? {
            if let Some(claimed) = self.claim(&job)? {
                if let Err(e) = self.process(&job, &claimed) {
                    self.release(&job, &claimed);
                    return Err(e);
                }
                return Ok(Activity::DidWork);
            }
        }
        Ok(Activity::Idle)
    }
}

/// Refuses to start unless the spool directory exists and is writable.
#[derive(Debug, Clone)]
pub struct SpoolDirConstraint {
    spool_dir: PathBuf,
}

impl SpoolDirConstraint {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
        }
    }
}

impl Constraint for SpoolDirConstraint {
    fn name(&self) -> &str {
        "spool-dir"
    }

    fn check(&self, _ctx: &ConstraintContext<'_>) -> std::result::Result<(), String> {
        let meta = fs::metadata(&self.spool_dir)
            .map_err(|e| format!("{}: {}", self.spool_dir.display(), e))?;
        if !meta.is_dir() {
            return Err(format!("{} is not a directory", self.spool_dir.display()));
        }
        access(&self.spool_dir, AccessFlags::W_OK)
            .map_err(|e| format!("{} is not writable: {}", self.spool_dir.display(), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebbd::{DaemonConfig, ExecutionMode};
    use tempfile::tempdir;

    fn check(constraint: &SpoolDirConstraint) -> std::result::Result<(), String> {
        let config = DaemonConfig::default();
        constraint.check(&ConstraintContext {
            config: &config,
            mode: ExecutionMode::Spawn,
        })
    }

    #[test]
    fn test_empty_spool_is_idle() {
        let dir = tempdir().unwrap();
        let mut drain = SpoolDrain::new(dir.path());
        assert_eq!(drain.run().unwrap(), Activity::Idle);
    }

    #[test]
    fn test_processes_one_job_per_run() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.job"), "one\ntwo\n").unwrap();
        fs::write(dir.path().join("a.job"), "first\n").unwrap();
        let mut drain = SpoolDrain::new(dir.path());

        assert_eq!(drain.run().unwrap(), Activity::DidWork);
        assert!(dir.path().join("done/a.job").exists());
        assert!(dir.path().join("b.job").exists());

        assert_eq!(drain.run().unwrap(), Activity::DidWork);
        assert!(dir.path().join("done/b.job").exists());

        assert_eq!(drain.run().unwrap(), Activity::Idle);
    }

    #[test]
    fn test_hidden_files_and_directories_are_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".partial"), "still uploading").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        let mut drain = SpoolDrain::new(dir.path());
        assert_eq!(drain.run().unwrap(), Activity::Idle);
        assert!(dir.path().join(".partial").exists());
    }

    #[test]
    fn test_missing_spool_is_an_error() {
        let dir = tempdir().unwrap();
        let mut drain = SpoolDrain::new(dir.path().join("gone"));
        assert!(drain.run().is_err());
    }

    #[test]
    fn test_claim_lost_race_returns_none() {
        let dir = tempdir().unwrap();
        let drain = SpoolDrain::new(dir.path());
        let claimed = drain.claim(&dir.path().join("vanished.job")).unwrap();
        assert!(claimed.is_none());
    }

    #[test]
    fn test_failed_job_returns_to_spool() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.job"), "retry me\n").unwrap();
        // A plain file where the done directory should go makes the move fail.
        fs::write(dir.path().join(DONE_DIR), "").unwrap();
        let mut drain = SpoolDrain::new(dir.path());

        assert!(drain.run().is_err());
        assert_eq!(
            fs::read_to_string(dir.path().join("a.job")).unwrap(),
            "retry me\n"
        );
        let leftovers = fs::read_dir(dir.path().join(CLAIMED_DIR)).unwrap().count();
        assert_eq!(leftovers, 0);

        // Once the obstacle is gone the same job is processed.
        fs::remove_file(dir.path().join(DONE_DIR)).unwrap();
        assert_eq!(drain.run().unwrap(), Activity::DidWork);
        assert!(dir.path().join("done/a.job").exists());
    }

    #[test]
    fn test_spool_dir_constraint_requires_write_access() {
        use std::os::unix::fs::PermissionsExt;

        // Root passes access(2) checks regardless of mode bits.
        if nix::unistd::geteuid().is_root() {
            return;
        }
        let dir = tempdir().unwrap();
        let spool = dir.path().join("spool");
        fs::create_dir(&spool).unwrap();
        fs::set_permissions(&spool, fs::Permissions::from_mode(0o555)).unwrap();

        let result = check(&SpoolDirConstraint::new(&spool));
        fs::set_permissions(&spool, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(result.unwrap_err().contains("not writable"));
    }

    #[test]
    fn test_spool_dir_constraint() {
        let dir = tempdir().unwrap();
        assert!(check(&SpoolDirConstraint::new(dir.path())).is_ok());

        let missing = check(&SpoolDirConstraint::new(dir.path().join("missing")));
        assert!(missing.unwrap_err().contains("missing"));

        let file = dir.path().join("file");
        fs::write(&file, "").unwrap();
        let not_dir = check(&SpoolDirConstraint::new(&file));
        assert!(not_dir.unwrap_err().contains("not a directory"));
    }
}
