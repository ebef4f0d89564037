use crate::error::{ErrorKind, Result};
use crate::{CommandOutcome, Decoding};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::instrument;

/// Something that can run a program with an argument vector and hand back
/// everything it printed.
///
/// This is the seam between the scanner logic and the operating system;
/// [`ProcessBridge`] is the real thing, tests substitute a scripted runner.
#[async_trait]
pub trait CommandRunner {
    /// The program this runner invokes, for logs and error messages.
    fn program(&self) -> &Path;

    /// Run the program to completion and capture its output.
    ///
    /// Only a failure to *start* the program is an error. A non-zero exit code
    /// is reported in [`CommandOutcome::exit_code`] because some callers need
    /// to carry on regardless.
    async fn execute(&self, args: &[String]) -> Result<CommandOutcome>;
}

/// Runs an external executable through `tokio::process`.
///
/// # Examples
///
/// ```no_run
/// use scanbridge_console::{CommandRunner, ProcessBridge};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let naps2 = ProcessBridge::new(r"C:\naps2\App\NAPS2.Console.exe");
/// let args = ["--listdevices", "--driver", "wia"].map(String::from);
/// let outcome = naps2.execute(&args).await?;
/// println!("{}", outcome.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ProcessBridge {
    program: PathBuf,
    working_dir: Option<PathBuf>,
    decoding: Decoding,
    timeout: Option<Duration>,
}
impl ProcessBridge {
    /// Create a bridge that runs `program` from its own directory and decodes
    /// output as CP850.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        // NAPS2 resolves its Data directory relative to the working directory.
        let working_dir = program.parent().filter(|p| !p.as_os_str().is_empty()).map(Path::to_path_buf);
        Self { program, working_dir, decoding: Decoding::default(), timeout: None }
    }

    pub fn with_decoding(mut self, decoding: Decoding) -> Self {
        self.decoding = decoding;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<Option<PathBuf>>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Kill the child and fail with [`ErrorKind::Timeout`] if it runs longer
    /// than `timeout`. There is no timeout unless one is set here.
    pub fn with_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        #[cfg(windows)]
        {
            // CREATE_NO_WINDOW: don't flash a console window when running as a service.
            command.creation_flags(0x0800_0000);
        }
        command
    }
}

#[async_trait]
impl CommandRunner for ProcessBridge {
    fn program(&self) -> &Path {
        &self.program
    }

    #[instrument(skip_all, fields(program = %self.program.display()))]
    async fn execute(&self, args: &[String]) -> Result<CommandOutcome> {
        tracing::info!(args = %args.join(" "), "Executing external command");
        let pending = self.command(args).output();
        // Dropping the pending future on timeout kills the child (kill_on_drop).
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pending).await.or_raise(|| ErrorKind::Timeout(limit))?,
            None => pending.await,
        };
        let output = output.or_raise(|| ErrorKind::Launch(self.program.clone()))?;
        let exit_code = output.status.code().unwrap_or(-1);
        tracing::info!(exit_code, "Command finished");
        Ok(CommandOutcome {
            stdout: self.decoding.decode(&output.stdout),
            stderr: self.decoding.decode(&output.stderr),
            exit_code,
        })
    }
}
