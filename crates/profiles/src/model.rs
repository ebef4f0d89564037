use crate::Violations;
use derive_more::Display;
use scanbridge_devices::Driver;
use serde::{Deserialize, Serialize};

/// The device a profile scans with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    pub id: String,
    pub name: String,
}

/// The driver a profile is bound to. Unlike [`Driver`], NAPS2 also allows
/// leaving it blank, in which case it picks one itself at scan time.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DriverName {
    #[default]
    #[display("wia")]
    #[serde(rename = "wia")]
    Wia,
    #[display("twain")]
    #[serde(rename = "twain")]
    Twain,
    #[display("")]
    #[serde(rename = "")]
    #[cfg_attr(feature = "cli", value(name = "none"))]
    Unset,
}

impl DriverName {
    /// The value stored in the `DriverName` element.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Wia => "wia",
            Self::Twain => "twain",
            Self::Unset => "",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "wia" => Some(Self::Wia),
            "twain" => Some(Self::Twain),
            "" => Some(Self::Unset),
            _ => None,
        }
    }

    pub fn driver(self) -> Option<Driver> {
        match self {
            Self::Wia => Some(Driver::Wia),
            Self::Twain => Some(Driver::Twain),
            Self::Unset => None,
        }
    }
}

impl From<Driver> for DriverName {
    fn from(driver: Driver) -> Self {
        match driver {
            Driver::Wia => Self::Wia,
            Driver::Twain => Self::Twain,
        }
    }
}

/// A saved scan configuration, as far as this crate understands it.
///
/// The on-disk record holds many more settings; those survive every
/// operation untouched but aren't exposed here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProfile {
    pub display_name: String,
    pub is_default: bool,
    pub device: DeviceRef,
    pub driver_name: DriverName,
    pub bit_depth: String,
    pub page_size: String,
    pub resolution: String,
    pub paper_source: String,
}

/// Input for [`ProfileStore::create`](crate::ProfileStore::create).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub display_name: String,
    #[serde(default)]
    pub is_default: bool,
    pub device: DeviceRef,
    #[serde(default)]
    pub driver_name: DriverName,
    #[serde(default = "NewProfile::default_bit_depth")]
    pub bit_depth: String,
    #[serde(default = "NewProfile::default_page_size")]
    pub page_size: String,
    #[serde(default = "NewProfile::default_resolution")]
    pub resolution: String,
    #[serde(default = "NewProfile::default_paper_source")]
    pub paper_source: String,
}

impl NewProfile {
    /// A profile for `device` with NAPS2's usual settings: WIA, 24-bit colour,
    /// Letter, 300 DPI, flatbed.
    pub fn new(display_name: impl Into<String>, device: DeviceRef) -> Self {
        Self {
            display_name: display_name.into(),
            is_default: false,
            device,
            driver_name: DriverName::default(),
            bit_depth: Self::default_bit_depth(),
            page_size: Self::default_page_size(),
            resolution: Self::default_resolution(),
            paper_source: Self::default_paper_source(),
        }
    }

    fn default_bit_depth() -> String {
        "C24Bit".to_string()
    }

    fn default_page_size() -> String {
        "Letter".to_string()
    }

    fn default_resolution() -> String {
        "Dpi300".to_string()
    }

    fn default_paper_source() -> String {
        "Glass".to_string()
    }

    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        violations.require("displayName", &self.display_name, "Display name is required");
        violations.require("device.id", &self.device.id, "Device ID is required");
        violations.require("device.name", &self.device.name, "Device name is required");
        violations.into_result()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceUpdate {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Input for [`ProfileStore::update`](crate::ProfileStore::update). Fields
/// left as `None` are not touched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub is_default: Option<bool>,
    pub device: Option<DeviceUpdate>,
    pub driver_name: Option<DriverName>,
    pub bit_depth: Option<String>,
    pub page_size: Option<String>,
    pub resolution: Option<String>,
    pub paper_source: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        if let Some(name) = &self.display_name {
            violations.require("displayName", name, "Display name must not be empty");
        }
        violations.into_result()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
