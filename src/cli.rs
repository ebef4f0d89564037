use clap::{Args, Parser, Subcommand};
use scanbridge_devices::Driver;
use scanbridge_profiles::{DeviceRef, DeviceUpdate, DriverName, NewProfile, ProfileUpdate};
use scanbridge_scan::{BitDepth, OutputFormat, PaperSource, ScanOptions};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "scanbridge", version, about = "Drive NAPS2 scanners and manage their saved profiles")]
pub struct Cli {
    /// Additional configuration file (TOML, YAML or JSON).
    #[arg(long, global = true, env = "SCANBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List connected scanners
    Devices {
        /// Only list devices reachable through this driver
        #[arg(long, value_enum)]
        driver: Option<Driver>,
    },
    /// Manage NAPS2 scan profiles
    #[command(subcommand)]
    Profiles(ProfilesCommand),
    /// Scan a document
    Scan(ScanArgs),
}

#[derive(Debug, Subcommand)]
pub enum ProfilesCommand {
    /// List every profile
    List,
    /// Show a single profile
    Get { name: String },
    /// Create a profile
    Create(CreateArgs),
    /// Change some of a profile's settings
    Update(UpdateArgs),
    /// Delete a profile
    Delete { name: String },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub name: String,
    #[arg(long)]
    pub device_id: String,
    #[arg(long)]
    pub device_name: String,
    #[arg(long, value_enum, default_value_t = DriverName::Wia)]
    pub driver: DriverName,
    /// Make this the default profile
    #[arg(long)]
    pub default: bool,
    #[arg(long)]
    pub bit_depth: Option<String>,
    #[arg(long)]
    pub page_size: Option<String>,
    #[arg(long)]
    pub resolution: Option<String>,
    #[arg(long)]
    pub paper_source: Option<String>,
}

impl From<CreateArgs> for NewProfile {
    fn from(args: CreateArgs) -> Self {
        let mut profile = NewProfile::new(args.name, DeviceRef { id: args.device_id, name: args.device_name });
        profile.driver_name = args.driver;
        profile.is_default = args.default;
        if let Some(bit_depth) = args.bit_depth {
            profile.bit_depth = bit_depth;
        }
        if let Some(page_size) = args.page_size {
            profile.page_size = page_size;
        }
        if let Some(resolution) = args.resolution {
            profile.resolution = resolution;
        }
        if let Some(paper_source) = args.paper_source {
            profile.paper_source = paper_source;
        }
        profile
    }
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub name: String,
    /// New display name
    #[arg(long)]
    pub rename: Option<String>,
    #[arg(long)]
    pub default: Option<bool>,
    #[arg(long)]
    pub device_id: Option<String>,
    #[arg(long)]
    pub device_name: Option<String>,
    #[arg(long, value_enum)]
    pub driver: Option<DriverName>,
    #[arg(long)]
    pub bit_depth: Option<String>,
    #[arg(long)]
    pub page_size: Option<String>,
    #[arg(long)]
    pub resolution: Option<String>,
    #[arg(long)]
    pub paper_source: Option<String>,
}

impl UpdateArgs {
    pub fn into_update(self) -> (String, ProfileUpdate) {
        let device = match (self.device_id, self.device_name) {
            (None, None) => None,
            (id, name) => Some(DeviceUpdate { id, name }),
        };
        let update = ProfileUpdate {
            display_name: self.rename,
            is_default: self.default,
            device,
            driver_name: self.driver,
            bit_depth: self.bit_depth,
            page_size: self.page_size,
            resolution: self.resolution,
            paper_source: self.paper_source,
        };
        (self.name, update)
    }
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Scan with this saved profile
    #[arg(long, short)]
    pub profile: Option<String>,
    #[arg(long, value_enum)]
    pub driver: Option<Driver>,
    /// Device name, as listed by `scanbridge devices`
    #[arg(long)]
    pub device: Option<String>,
    #[arg(long, value_enum)]
    pub source: Option<PaperSource>,
    #[arg(long)]
    pub dpi: Option<u32>,
    #[arg(long, value_enum)]
    pub bit_depth: Option<BitDepth>,
    #[arg(long)]
    pub page_size: Option<String>,
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
    /// Number of scans to perform
    #[arg(long, short = 'n')]
    pub count: Option<u32>,
}

impl From<ScanArgs> for ScanOptions {
    fn from(args: ScanArgs) -> Self {
        Self {
            profile: args.profile,
            driver: args.driver,
            device: args.device,
            source: args.source,
            dpi: args.dpi,
            bit_depth: args.bit_depth,
            page_size: args.page_size,
            output_format: args.format,
            number_of_scans: args.count,
        }
    }
}
