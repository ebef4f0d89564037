use crate::{BitDepth, PaperSource, ScanOptions};
use scanbridge_devices::Driver;
use scanbridge_profiles::ScanProfile;
use std::path::Path;

/// Everything the console is told about one scan, after profile resolution
/// and request overrides have been merged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanParameters {
    pub profile: Option<String>,
    pub driver: Option<Driver>,
    pub device: Option<String>,
    pub source: Option<PaperSource>,
    pub dpi: Option<u32>,
    pub bit_depth: Option<BitDepth>,
    pub page_size: Option<String>,
    pub count: Option<u32>,
}

impl ScanParameters {
    /// Scan with a saved profile. The profile's own driver and device are
    /// passed along too, since NAPS2 otherwise prompts when the device is
    /// ambiguous.
    pub fn for_profile(profile: &ScanProfile) -> Self {
        Self {
            profile: Some(profile.display_name.clone()),
            driver: profile.driver_name.driver(),
            device: Some(profile.device.name.clone()).filter(|name| !name.is_empty()),
            ..Self::default()
        }
    }

    pub fn for_device(driver: Driver, device: impl Into<String>) -> Self {
        Self { driver: Some(driver), device: Some(device.into()), ..Self::default() }
    }

    /// Apply the per-request overrides from `options`.
    pub fn with_overrides(mut self, options: &ScanOptions) -> Self {
        self.source = options.source.or(self.source);
        self.dpi = options.dpi.or(self.dpi);
        self.bit_depth = options.bit_depth.or(self.bit_depth);
        self.page_size = options.page_size.clone().or(self.page_size);
        self.count = options.number_of_scans.or(self.count);
        self
    }

    /// The console's argument vector for writing the scan to `output`.
    ///
    /// Optional settings only appear when set; `-f` (overwrite without
    /// asking) always comes last.
    pub fn to_args(&self, output: &Path) -> Vec<String> {
        let mut args = vec!["-o".to_string(), output.display().to_string()];
        let mut flag = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                args.push(name.to_string());
                args.push(value);
            }
        };
        flag("-p", self.profile.clone());
        flag("--driver", self.driver.map(|driver| driver.tag().to_string()));
        flag("--device", self.device.clone());
        flag("--source", self.source.map(|source| source.to_string()));
        flag("--dpi", self.dpi.map(|dpi| dpi.to_string()));
        flag("--bitdepth", self.bit_depth.map(|depth| depth.to_string()));
        flag("--pagesize", self.page_size.clone());
        flag("-n", self.count.map(|count| count.to_string()));
        args.push("-f".to_string());
        args
    }
}
