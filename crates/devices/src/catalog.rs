use crate::error::Result;
use crate::{DeviceInfo, DeviceLister, Driver, WiaResolver};

/// Device listing as the request layer sees it: NAPS2's listing for one or
/// all drivers, followed by best-effort WIA ID enrichment.
#[derive(Clone)]
pub struct DeviceCatalog {
    lister: DeviceLister,
    resolver: Option<WiaResolver>,
}
impl DeviceCatalog {
    pub fn new(lister: DeviceLister, resolver: impl Into<Option<WiaResolver>>) -> Self {
        Self { lister, resolver: resolver.into() }
    }

    /// List devices for `driver`, or for every driver when `None`.
    ///
    /// Listing failures propagate (a single-driver failure always, an
    /// all-driver failure only when every driver failed). Enrichment failures
    /// never do.
    pub async fn list(&self, driver: Option<Driver>) -> Result<Vec<DeviceInfo>> {
        let devices = match driver {
            Some(driver) => self.lister.list_by_driver(driver).await?,
            None => self.lister.list_all().await?,
        };
        Ok(match &self.resolver {
            Some(resolver) => resolver.enrich(devices).await,
            None => devices,
        })
    }
}
