//! Console Error Types
//!
//! Structured errors built on `exn`, so every failure carries the location it
//! was raised at and the lower-level error (usually an `io::Error`) as a child.

use derive_more::{Display, Error};
use std::path::PathBuf;
use std::time::Duration;

/// A console error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for console operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// A non-zero exit code is deliberately *not* an error at this layer; it is
/// reported through [`CommandOutcome`](crate::CommandOutcome) for the caller
/// to interpret.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The executable could not be spawned (missing binary, permission denied).
    #[display("failed to launch {}", _0.display())]
    Launch(#[error(not(source))] PathBuf),
    /// The process outlived the configured timeout and was killed.
    #[display("command timed out after {_0:?}")]
    Timeout(#[error(not(source))] Duration),
    /// None of the candidate executables could be found on `PATH`.
    #[display("executable not found (tried: {})", _0.join(", "))]
    NotFound(#[error(not(source))] Vec<String>),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Launch(PathBuf::from("naps2")).to_string(), "failed to launch naps2");
        assert_eq!(
            ErrorKind::NotFound(vec!["powershell".to_string(), "pwsh".to_string()]).to_string(),
            "executable not found (tried: powershell, pwsh)"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::Launch(PathBuf::from("naps2")).is_retryable());
        assert!(ErrorKind::Timeout(Duration::from_secs(5)).is_retryable());
    }
}
