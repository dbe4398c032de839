//! Error types for ebbd.

use thiserror::Error;

/// Main error type for ebbd.
///
/// Only startup errors (`ConstraintViolation`, `Detachment`, `InvalidConfig`)
/// ever reach the caller of [`crate::Supervisor::start`]. Spawn and wait
/// failures are absorbed by the scheduler loop.
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Constraint '{constraint}' not fulfilled: {reason}")]
    ConstraintViolation { constraint: String, reason: String },

    #[error("Could not detach from the controlling session: {0}")]
    Detachment(String),

    #[error("Failed to spawn worker: {0}")]
    Spawn(String),

    #[error("No child processes left to wait for")]
    NoChildren,

    #[error("Waiting for workers failed: {0}")]
    Wait(nix::errno::Errno),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ebbd operations.
pub type Result<T> = std::result::Result<T, DaemonError>;
