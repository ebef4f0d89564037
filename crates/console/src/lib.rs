//! Process bridge to external command-line tools.
//!
//! Everything that talks to the scanner hardware goes through an external
//! executable (NAPS2.Console, or PowerShell for the WIA device manager). This
//! crate owns spawning those processes, buffering their output, and decoding
//! it into text:
//!
//! - [`CommandRunner`] is the trait the rest of the workspace depends on,
//!   shared as a [`RunnerHandle`].
//! - [`ProcessBridge`] is the `tokio::process` implementation.
//! - [`Decoding`] picks the code page; NAPS2 always writes CP850.
//! - `MockRunner` (feature `mock`) is a scripted runner for tests.

mod bridge;
mod decode;
mod discover;
pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod outcome;

pub use crate::bridge::{CommandRunner, ProcessBridge};
pub use crate::decode::Decoding;
pub use crate::discover::discover;
#[cfg(feature = "mock")]
pub use crate::mock::MockRunner;
pub use crate::outcome::{CommandOutcome, diagnostic};
use std::sync::Arc;

pub type RunnerHandle = Arc<dyn CommandRunner + Send + Sync>;
