//! Scan Error Types

use derive_more::{Display, Error};
use scanbridge_console::diagnostic;
use scanbridge_profiles::Violations;
use std::path::PathBuf;

/// A scan error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The request was rejected before anything ran.
    #[display("{_0}")]
    Validation(#[error(not(source))] Violations),
    #[display("Profile '{_0}' not found")]
    ProfileNotFound(#[error(not(source))] String),
    /// The profile document could not be read.
    #[display("could not read scan profiles")]
    Profiles,
    /// The external tool could not be started at all.
    #[display("scanning console could not be run")]
    Console,
    /// The console ran the scan and reported failure.
    #[display("Scan failed: {}", diagnostic(stderr, stdout))]
    Execution { exit_code: i32, stderr: String, stdout: String },
    /// The console reported success, but the output file isn't there.
    #[display("Scan completed but output file was not created at: {}", _0.display())]
    Verification(#[error(not(source))] PathBuf),
    #[display("could not check for scan output at {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The scanner was shut down while the scan waited for its turn.
    #[display("scanner is no longer accepting scans")]
    Closed,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Paper jams, an empty feeder and sleeping devices all look like this.
        matches!(self, Self::Execution { .. } | Self::Verification(_))
    }

    /// Exit code and captured output, when the failure came from a process that ran.
    pub fn process_details(&self) -> Option<(i32, &str, &str)> {
        match self {
            Self::Execution { exit_code, stderr, stdout } => Some((*exit_code, stderr.as_str(), stdout.as_str())),
            _ => None,
        }
    }
}
