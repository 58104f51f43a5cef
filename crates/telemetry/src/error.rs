//! Telemetry error types.
//!
//! Every fault from the OS metrics layer is a tagged variant here; the
//! tool host converts these into structured error records, so nothing
//! below this crate crosses the tool boundary unconverted.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("no process with PID {0}")]
    NotFound(u32),

    #[error("access denied to process {0}")]
    PermissionDenied(u32),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("signal delivery is not supported on this platform")]
    Unsupported,

    #[error("process {0} is still running after SIGKILL")]
    KillFailed(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
