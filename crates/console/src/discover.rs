use crate::error::{ErrorKind, Result};
use std::path::PathBuf;

/// Find the first of `candidates` that is executable from `PATH`.
///
/// Used for host tools we don't ship ourselves, such as the PowerShell host
/// that runs the WIA enumeration script.
pub fn discover(candidates: &[&str]) -> Result<PathBuf> {
    for candidate in candidates {
        if let Ok(path) = which::which(candidate) {
            tracing::debug!(executable = %path.display(), "Discovered executable on PATH");
            return Ok(path);
        }
    }
    tracing::info!(candidates = ?candidates, "No candidate executable found in PATH");
    exn::bail!(ErrorKind::NotFound(candidates.iter().map(|c| c.to_string()).collect()));
}
