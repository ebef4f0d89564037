/// Captured result of a single external process invocation.
///
/// Output is fully buffered and already decoded; see [`Decoding`](crate::Decoding).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code, or `-1` if the process was terminated without one.
    pub exit_code: i32,
}

impl CommandOutcome {
    /// A successful run that printed `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { stdout: stdout.into(), ..Self::default() }
    }

    /// A run that exited with `exit_code` after printing `stderr`.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self { stderr: stderr.into(), exit_code, ..Self::default() }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The most useful bit of output to show a human when something went wrong.
    pub fn diagnostic(&self) -> &str {
        diagnostic(&self.stderr, &self.stdout)
    }
}

/// Prefer stderr, fall back to stdout, and finally to a placeholder. The
/// NAPS2 console is inconsistent about which stream it reports errors on.
pub fn diagnostic<'a>(stderr: &'a str, stdout: &'a str) -> &'a str {
    [stderr, stdout].into_iter().map(str::trim).find(|s| !s.is_empty()).unwrap_or("Unknown error")
}
