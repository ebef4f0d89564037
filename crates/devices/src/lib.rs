//! Scanner discovery.
//!
//! NAPS2 reaches scanners through two competing driver stacks, WIA and TWAIN
//! (see [`Driver`]). [`DeviceLister`] asks the NAPS2 console for each driver's
//! devices and tolerates a missing stack; [`WiaResolver`] then recovers the
//! stable WIA device IDs that the console doesn't print. [`DeviceCatalog`]
//! puts the two together.

mod catalog;
mod device;
mod driver;
pub mod error;
mod lister;
mod resolver;

pub use crate::catalog::DeviceCatalog;
pub use crate::device::DeviceInfo;
pub use crate::driver::Driver;
pub use crate::lister::{DeviceLister, parse_device_list};
pub use crate::resolver::{NativeDevice, WiaResolver, apply_native_ids, parse_native_listing};
