//! Scanning.
//!
//! A scan request ([`ScanOptions`]) names a scanner in one of two ways: a
//! saved profile, or a driver and device. [`Scanner`] validates the request,
//! resolves a profile through the profile store, merges per-request overrides
//! into [`ScanParameters`], runs the NAPS2 console and then checks that the
//! output file really exists before reporting a [`ScanResult`].

mod args;
pub mod error;
mod options;
mod orchestrator;
mod result;

pub use crate::args::ScanParameters;
pub use crate::options::{BitDepth, DPI_RANGE, OutputFormat, PaperSource, ScanOptions, Selection};
pub use crate::orchestrator::Scanner;
pub use crate::result::ScanResult;
