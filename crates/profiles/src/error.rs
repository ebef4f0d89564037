//! Profile Error Types

use crate::Violations;
use derive_more::{Display, Error};
use std::path::PathBuf;

/// A profile store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for profile store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Everything but `Io` and `Parse` is the caller's fault; neither of those
/// two are something the caller can fix by changing their request.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Input failed validation. Nothing was written.
    #[display("{_0}")]
    Validation(#[error(not(source))] Violations),
    #[display("Profile '{_0}' not found")]
    NotFound(#[error(not(source))] String),
    #[display("Profile '{_0}' already exists")]
    Duplicate(#[error(not(source))] String),
    /// The persisted document is unreadable or breaks the profile schema.
    #[display("Failed to parse profiles document: {_0}")]
    Parse(#[error(not(source))] String),
    #[display("I/O error on profiles document: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Another program (NAPS2 itself) may briefly hold the document open.
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Violation;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Duplicate("Office".to_string()).to_string(), "Profile 'Office' already exists");
        assert_eq!(ErrorKind::NotFound("Home".to_string()).to_string(), "Profile 'Home' not found");
        let violations = Violations::from(vec![Violation::new("displayName", "Display name is required")]);
        assert_eq!(ErrorKind::Validation(violations).to_string(), "'displayName': Display name is required");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Io(PathBuf::from("profiles.xml")).is_retryable());
        assert!(!ErrorKind::Parse("no root".to_string()).is_retryable());
        assert!(!ErrorKind::Duplicate("Office".to_string()).is_retryable());
    }
}
