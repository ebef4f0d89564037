use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// One of the two OS-level scanner driver stacks NAPS2 can talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Windows Image Acquisition, the legacy OS imaging driver.
    Wia,
    /// The TWAIN industry standard.
    Twain,
}

impl Driver {
    /// Every driver, in the order devices are listed.
    pub const ALL: [Driver; 2] = [Driver::Wia, Driver::Twain];

    /// The tag NAPS2 uses for this driver on its command line and in profiles.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Wia => "wia",
            Self::Twain => "twain",
        }
    }
}

impl Display for Driver {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.tag())
    }
}

impl FromStr for Driver {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|driver| driver.tag() == s)
            .ok_or_else(|| ErrorKind::UnknownDriver(s.to_string()).into())
    }
}
