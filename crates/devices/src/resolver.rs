use crate::error::{ErrorKind, Result};
use crate::{DeviceInfo, Driver};
use exn::ResultExt;
use scanbridge_console::RunnerHandle;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::instrument;

/// WIA device type reported for scanners (as opposed to cameras and video devices).
const SCANNER_DEVICE_TYPE: i64 = 1;

/// A device as reported by the WIA device manager.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NativeDevice {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: i64,
}

/// PowerShell's `ConvertTo-Json` collapses single-element arrays into a bare object.
#[derive(Deserialize)]
#[serde(untagged)]
enum NativeListing {
    Many(Vec<NativeDevice>),
    One(NativeDevice),
}

/// Recovers WIA device IDs, which NAPS2's `--listdevices` output leaves out.
///
/// Runs a PowerShell script against the WIA device manager and matches the
/// devices it reports to NAPS2's by name.
#[derive(Clone)]
pub struct WiaResolver {
    shell: RunnerHandle,
    script: PathBuf,
}
impl WiaResolver {
    /// `shell` must run PowerShell (and decode as UTF-8); `script` is the
    /// enumeration script it is handed.
    pub fn new(shell: RunnerHandle, script: impl Into<PathBuf>) -> Self {
        Self { shell, script: script.into() }
    }

    fn args(&self) -> Vec<String> {
        let mut args: Vec<String> =
            ["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-File"].map(String::from).into();
        args.push(self.script.display().to_string());
        args
    }

    /// List the scanners the WIA device manager knows about.
    #[instrument(skip(self), fields(script = %self.script.display()))]
    pub async fn list_native_devices(&self) -> Result<Vec<NativeDevice>> {
        let outcome = self.shell.execute(&self.args()).await.or_raise(|| ErrorKind::Console)?;
        if !outcome.success() {
            exn::bail!(ErrorKind::Enumeration(format!(
                "script exited with code {}: {}",
                outcome.exit_code,
                outcome.diagnostic()
            )));
        }
        parse_native_listing(&outcome.stdout)
    }

    /// Fill in the `id` of WIA devices that the device manager also reports.
    ///
    /// This is best-effort: if enumeration fails for any reason the failure is
    /// logged and `devices` is returned untouched.
    pub async fn enrich(&self, devices: Vec<DeviceInfo>) -> Vec<DeviceInfo> {
        if !devices.iter().any(|d| d.driver == Driver::Wia) {
            return devices;
        }
        match self.list_native_devices().await {
            Ok(native) => apply_native_ids(devices, &native),
            Err(err) => {
                let kind: &ErrorKind = &err;
                tracing::warn!(error = %kind, "Could not enrich devices with WIA IDs");
                devices
            },
        }
    }
}

/// Parse the enumeration script's JSON, keeping only scanners.
///
/// Empty output means no devices at all (the script prints nothing rather
/// than an empty array).
pub fn parse_native_listing(stdout: &str) -> Result<Vec<NativeDevice>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let listing: NativeListing = serde_json::from_str(trimmed).or_raise(|| ErrorKind::MalformedListing)?;
    let devices = match listing {
        NativeListing::Many(devices) => devices,
        NativeListing::One(device) => vec![device],
    };
    Ok(devices.into_iter().filter(|d| d.kind == SCANNER_DEVICE_TYPE).collect())
}

/// Match WIA devices to native devices by case-insensitive name. Devices from
/// other drivers, and WIA devices without a match, keep their existing `id`.
pub fn apply_native_ids(devices: Vec<DeviceInfo>, native: &[NativeDevice]) -> Vec<DeviceInfo> {
    devices
        .into_iter()
        .map(|device| {
            if device.driver != Driver::Wia {
                return device;
            }
            let name = device.name.to_lowercase();
            match native.iter().find(|n| n.name.to_lowercase() == name) {
                Some(found) => {
                    tracing::debug!(device = %device.name, id = %found.id, "Matched device with WIA ID");
                    device.with_id(found.id.clone())
                },
                None => {
                    tracing::debug!(device = %device.name, "No WIA match for device");
                    device
                },
            }
        })
        .collect()
}
