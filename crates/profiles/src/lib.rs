//! Scan profiles, stored the way NAPS2 stores them.
//!
//! NAPS2 keeps its profiles in `Data/profiles.xml` and owns that file's
//! schema. [`ProfileStore`] gives typed CRUD over the handful of fields this
//! workspace cares about ([`ScanProfile`]) and carries every other setting
//! through reads and writes untouched (see [`RawProfile`]). It also enforces
//! what NAPS2 itself does not: display names are unique and at most one
//! profile is the default.

mod document;
pub mod error;
mod model;
mod raw;
mod store;
mod validate;

pub use crate::document::ProfileDocument;
pub use crate::model::{DeviceRef, DeviceUpdate, DriverName, NewProfile, ProfileUpdate, ScanProfile};
pub use crate::raw::RawProfile;
pub use crate::store::ProfileStore;
pub use crate::validate::{Violation, Violations};
