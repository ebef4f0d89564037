//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration file {} does not exist", _0.display())]
    MissingFile(#[error(not(source))] PathBuf),
    #[display("configuration file {} must be TOML, YAML or JSON", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A source couldn't be read or a value has the wrong type; the cause is attached.
    #[display("invalid configuration")]
    Invalid,
    #[display("could not determine the installation directory")]
    NoBaseDirectory,
    #[display("could not create directory {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
