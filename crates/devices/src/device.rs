use crate::Driver;
use serde::Serialize;

/// A scanner as reported by one driver.
///
/// Two entries refer to the same scanner when `driver` and `name` match. The
/// `id` is only known when the WIA enrichment step found the device; NAPS2's
/// own listing never includes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub driver: Driver,
}

impl DeviceInfo {
    /// A device known only by name, as NAPS2 lists it.
    pub fn named(name: impl Into<String>, driver: Driver) -> Self {
        Self { id: String::new(), name: name.into(), driver }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}
