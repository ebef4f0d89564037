use crate::error::{ErrorKind, Result};
use crate::{ScanOptions, ScanParameters, ScanResult, Selection};
use exn::{OptionExt, ResultExt};
use scanbridge_console::RunnerHandle;
use scanbridge_profiles::ProfileStore;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tracing::instrument;
use uuid::Uuid;

/// Runs scans through the NAPS2 console.
///
/// A scanner is one physical device that NAPS2 doesn't arbitrate access to,
/// so scans are admitted a few at a time (one, unless configured otherwise);
/// the rest wait their turn.
pub struct Scanner {
    console: RunnerHandle,
    profiles: Arc<ProfileStore>,
    output_dir: PathBuf,
    admission: Semaphore,
}

impl Scanner {
    pub fn new(console: RunnerHandle, profiles: Arc<ProfileStore>, output_dir: impl Into<PathBuf>) -> Self {
        Self { console, profiles, output_dir: output_dir.into(), admission: Semaphore::new(1) }
    }

    /// Allow up to `permits` scans to run at the same time (at least one).
    pub fn with_concurrency(mut self, permits: usize) -> Self {
        self.admission = Semaphore::new(permits.max(1));
        self
    }

    /// Stop admitting scans. Scans already running finish; waiting ones fail
    /// with [`ErrorKind::Closed`].
    pub fn close(&self) {
        self.admission.close();
    }

    /// Validate `options`, run the scan, and check that it produced a file.
    ///
    /// Nothing is retried: a failed scan is reported as-is.
    #[instrument(skip_all, fields(profile = ?options.profile, device = ?options.device))]
    pub async fn scan(&self, options: ScanOptions) -> Result<ScanResult> {
        let selection = options.validate().map_err(ErrorKind::Validation)?;
        let params = match selection {
            Selection::Profile(name) => {
                let profile = self
                    .profiles
                    .get_by_name(&name)
                    .await
                    .or_raise(|| ErrorKind::Profiles)?
                    .ok_or_raise(|| ErrorKind::ProfileNotFound(name.clone()))?;
                ScanParameters::for_profile(&profile)
            },
            Selection::Custom { driver, device } => ScanParameters::for_device(driver, device),
        }
        .with_overrides(&options);

        let scan_id = Uuid::new_v4();
        let filename = format!("{scan_id}.{}", options.output_format.unwrap_or_default().extension());
        let path = self.output_dir.join(&filename);

        let _permit = self.admission.acquire().await.or_raise(|| ErrorKind::Closed)?;
        tracing::info!(%scan_id, "Starting scan");
        let outcome = self.console.execute(&params.to_args(&path)).await.or_raise(|| ErrorKind::Console)?;
        if !outcome.success() {
            exn::bail!(ErrorKind::Execution {
                exit_code: outcome.exit_code,
                stderr: outcome.stderr,
                stdout: outcome.stdout,
            });
        }
        // NAPS2 exits 0 when the feeder was empty or the user cancelled, without writing anything.
        if !tokio::fs::try_exists(&path).await.or_raise(|| ErrorKind::Io(path.clone()))? {
            tracing::warn!(%scan_id, output = %outcome.diagnostic(), "Scan reported success but wrote no file");
            exn::bail!(ErrorKind::Verification(path));
        }
        tracing::info!(%scan_id, path = %path.display(), "Scan complete");
        Ok(ScanResult { scan_id, filename, path, timestamp: OffsetDateTime::now_utc() })
    }
}
