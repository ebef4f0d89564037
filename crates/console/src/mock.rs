//! Scripted command runner for testing.

use crate::error::{ErrorKind, Result};
use crate::{CommandOutcome, CommandRunner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

type Handler = Box<dyn Fn(&[String]) -> Result<CommandOutcome> + Send + Sync>;

/// A [`CommandRunner`] that never spawns anything.
///
/// Every call is answered by a handler closure and the argument vector is
/// recorded, so tests can assert both on behaviour and on exactly what would
/// have been passed to the real executable.
///
/// # Examples
///
/// ```
/// use scanbridge_console::{CommandOutcome, CommandRunner, MockRunner};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let runner = MockRunner::replying(CommandOutcome::ok("Canon LiDE 300\n"));
/// let outcome = runner.execute(&["--listdevices".to_string()]).await?;
/// assert_eq!(outcome.stdout, "Canon LiDE 300\n");
/// assert_eq!(runner.calls(), vec![vec!["--listdevices".to_string()]]);
/// # Ok(())
/// # }
/// ```
pub struct MockRunner {
    program: PathBuf,
    handler: Handler,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockRunner {
    pub fn new(handler: impl Fn(&[String]) -> Result<CommandOutcome> + Send + Sync + 'static) -> Self {
        Self {
            program: PathBuf::from("mock"),
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with the same outcome.
    pub fn replying(outcome: CommandOutcome) -> Self {
        Self::new(move |_| Ok(outcome.clone()))
    }

    /// Behave like an executable that isn't installed.
    pub fn unlaunchable() -> Self {
        Self::new(|_| Err(ErrorKind::Launch(PathBuf::from("mock")).into()))
    }

    /// Every argument vector received so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    fn program(&self) -> &Path {
        &self.program
    }

    async fn execute(&self, args: &[String]) -> Result<CommandOutcome> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(args.to_vec());
        (self.handler)(args)
    }
}
