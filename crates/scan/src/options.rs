use derive_more::Display;
use scanbridge_devices::Driver;
use scanbridge_profiles::Violations;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Resolutions NAPS2 accepts on the command line.
pub const DPI_RANGE: RangeInclusive<u32> = 50..=2400;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum PaperSource {
    #[display("glass")]
    Glass,
    #[display("feeder")]
    Feeder,
    #[display("duplex")]
    Duplex,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum BitDepth {
    #[display("color")]
    Color,
    #[display("gray")]
    Gray,
    #[display("bw")]
    Bw,
}

/// File format of the scan output, chosen by NAPS2 from the file extension.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[display("pdf")]
    Pdf,
    #[display("jpg")]
    Jpg,
    #[display("png")]
    Png,
    #[display("tiff")]
    Tiff,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Tiff => "tiff",
        }
    }
}

/// Which scanner to use, and how.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Use a saved NAPS2 profile; its device and driver apply.
    Profile(String),
    /// Scan with a named device directly.
    Custom { driver: Driver, device: String },
}

/// A scan request.
///
/// Callers pick a scanner either by `profile` or by `driver` plus `device`,
/// never both. Every other field overrides the profile (or NAPS2's default)
/// when set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    pub profile: Option<String>,
    pub driver: Option<Driver>,
    pub device: Option<String>,
    pub source: Option<PaperSource>,
    pub dpi: Option<u32>,
    pub bit_depth: Option<BitDepth>,
    pub page_size: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub number_of_scans: Option<u32>,
}

impl ScanOptions {
    pub fn with_profile(name: impl Into<String>) -> Self {
        Self { profile: Some(name.into()), ..Self::default() }
    }

    pub fn with_device(driver: Driver, device: impl Into<String>) -> Self {
        Self { driver: Some(driver), device: Some(device.into()), ..Self::default() }
    }

    /// Check the request and work out which selection mode it uses.
    pub fn validate(&self) -> Result<Selection, Violations> {
        let mut violations = Violations::new();
        let selection = self.selection(&mut violations);

        if let Some(dpi) = self.dpi
            && !DPI_RANGE.contains(&dpi)
        {
            violations.push("dpi", format!("Must be between {} and {}", DPI_RANGE.start(), DPI_RANGE.end()));
        }
        if self.number_of_scans == Some(0) {
            violations.push("numberOfScans", "Must be at least 1");
        }
        if let Some(page_size) = &self.page_size {
            violations.require("pageSize", page_size, "Page size must not be empty");
        }

        violations.into_result()?;
        // A selection is always found when there were no violations.
        selection.ok_or_else(Violations::new)
    }

    fn selection(&self, violations: &mut Violations) -> Option<Selection> {
        let device = self.device.as_deref().filter(|device| !device.trim().is_empty());
        match (&self.profile, self.driver, device) {
            (Some(profile), None, None) if !profile.trim().is_empty() => Some(Selection::Profile(profile.clone())),
            (Some(profile), driver, _) => {
                violations.require("profile", profile, "Profile name cannot be empty");
                if driver.is_some() {
                    violations.push("driver", "Not allowed when scanning with a profile");
                }
                if self.device.is_some() {
                    violations.push("device", "Not allowed when scanning with a profile");
                }
                None
            },
            (None, Some(driver), Some(device)) => Some(Selection::Custom { driver, device: device.to_string() }),
            (None, None, None) if self.device.is_none() => {
                violations.push(
                    "",
                    "Provide either \"profile\" (profile name) OR both \"driver\" and \"device\" for custom scan",
                );
                None
            },
            (None, driver, _) => {
                if driver.is_none() {
                    violations.push("driver", "Driver is required for custom scan");
                }
                let device = self.device.as_deref().unwrap_or_default();
                violations.require("device", device, "Device name is required for custom scan");
                None
            },
        }
    }
}
