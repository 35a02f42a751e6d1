//! Error types for process launching and lifecycle tracking

use thiserror::Error;

/// Errors produced by the process core
#[derive(Error, Debug)]
pub enum ProcessError {
    /// `launch` was called on a handle that already left the `Created` state.
    /// Launch is strictly at-most-once per handle.
    #[error("Process already launched")]
    AlreadyLaunched,

    /// A wait deadline elapsed while the child was still running. The child
    /// is not terminated and can still be waited on afterwards.
    #[error("Timed out waiting for process to exit")]
    Timeout,

    /// An OS call failed; carries the underlying errno diagnostic.
    #[error("System error: {0}")]
    System(#[from] std::io::Error),
}

impl ProcessError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            ProcessError::AlreadyLaunched => "PROC001",
            ProcessError::Timeout => "PROC002",
            ProcessError::System(_) => "PROC003",
        }
    }
}

#[cfg(unix)]
impl From<nix::errno::Errno> for ProcessError {
    fn from(errno: nix::errno::Errno) -> Self {
        ProcessError::System(std::io::Error::from_raw_os_error(errno as i32))
    }
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
