//! Device Error Types
//!
//! Structured errors built on `exn`. Listing failures keep the full captured
//! output of the console so the request layer can hand it back to the caller.

use crate::Driver;
use derive_more::{Display, Error};
use scanbridge_console::diagnostic;

/// A device error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for device operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The external tool could not be started at all.
    #[display("scanning console could not be run")]
    Console,
    /// The console ran, but exited non-zero while listing one driver's devices.
    #[display("failed to list devices for driver '{driver}': {}", diagnostic(stderr, stdout))]
    DeviceList { driver: Driver, exit_code: i32, stderr: String, stdout: String },
    /// Every driver failed; the message combines each driver's failure.
    #[display("no devices found: {_0}")]
    AllDriversFailed(#[error(not(source))] String),
    /// The native enumeration script failed.
    #[display("native device enumeration failed: {_0}")]
    Enumeration(#[error(not(source))] String),
    /// The native enumeration script printed something that isn't the expected JSON.
    #[display("malformed native device listing")]
    MalformedListing,
    #[display("unknown driver '{_0}' (expected one of: wia, twain)")]
    UnknownDriver(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Scanners that are asleep or busy tend to fail the first listing.
        matches!(self, Self::DeviceList { .. } | Self::AllDriversFailed(_))
    }

    /// Exit code and captured output, when the failure came from a process that ran.
    pub fn process_details(&self) -> Option<(i32, &str, &str)> {
        match self {
            Self::DeviceList { exit_code, stderr, stdout, .. } => Some((*exit_code, stderr.as_str(), stdout.as_str())),
            _ => None,
        }
    }
}
