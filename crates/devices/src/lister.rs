use crate::error::{ErrorKind, Result};
use crate::{DeviceInfo, Driver};
use exn::ResultExt;
use futures::{StreamExt, stream};
use scanbridge_console::RunnerHandle;
use tracing::instrument;

/// NAPS2 prints a heading ("Available devices:" in current versions) before the list.
const HEADER_PREFIX: &str = "Available";
/// ...and sometimes underlines it.
const SEPARATOR_PREFIX: &str = "---";

/// Lists scanners by asking NAPS2.Console, one driver at a time.
#[derive(Clone)]
pub struct DeviceLister {
    console: RunnerHandle,
}
impl DeviceLister {
    pub fn new(console: RunnerHandle) -> Self {
        Self { console }
    }

    /// List the devices visible through a single driver.
    ///
    /// A non-zero exit from the console fails with [`ErrorKind::DeviceList`],
    /// carrying everything the console printed.
    #[instrument(skip(self))]
    pub async fn list_by_driver(&self, driver: Driver) -> Result<Vec<DeviceInfo>> {
        let args = ["--listdevices", "--driver", driver.tag()].map(String::from);
        let outcome = self.console.execute(&args).await.or_raise(|| ErrorKind::Console)?;
        if !outcome.success() {
            exn::bail!(ErrorKind::DeviceList {
                driver,
                exit_code: outcome.exit_code,
                stderr: outcome.stderr,
                stdout: outcome.stdout,
            });
        }
        let devices = parse_device_list(&outcome.stdout, driver);
        tracing::debug!(count = devices.len(), "Devices listed");
        Ok(devices)
    }

    /// List devices across every driver.
    ///
    /// Most machines only have one of the two driver stacks installed, so a
    /// failing driver is logged and skipped. This only fails when *every*
    /// driver failed, with a message combining all of their failures.
    ///
    /// Drivers are queried one after the other: the console talks to the
    /// hardware directly and two instances may contend for the same device.
    pub async fn list_all(&self) -> Result<Vec<DeviceInfo>> {
        let results: Vec<_> = stream::iter(Driver::ALL).then(|driver| self.list_by_driver(driver)).collect().await;
        let mut devices = Vec::new();
        let mut failures = Vec::new();
        for (driver, result) in Driver::ALL.into_iter().zip(results) {
            match result {
                Ok(found) => devices.extend(found),
                Err(err) => {
                    let kind: &ErrorKind = &err;
                    tracing::warn!(%driver, error = %kind, "Skipping driver; device listing failed");
                    failures.push(format!("{driver}: {kind}"));
                },
            }
        }
        if failures.len() == Driver::ALL.len() {
            exn::bail!(ErrorKind::AllDriversFailed(failures.join("; ")));
        }
        Ok(devices)
    }
}

/// Pull device names out of the console's `--listdevices` output.
///
/// There's no structured format: every non-blank line that isn't a heading or
/// a separator is a device name. Only the two literal prefixes are checked so
/// that rewording the heading in a future NAPS2 release doesn't break this.
pub fn parse_device_list(output: &str, driver: Driver) -> Vec<DeviceInfo> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(HEADER_PREFIX) && !line.starts_with(SEPARATOR_PREFIX))
        .map(|name| DeviceInfo::named(name, driver))
        .collect()
}
