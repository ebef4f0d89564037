//! Layered configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults, laid out relative to the installation directory (the
//!    directory holding the executable).
//! 2. `scanbridge.toml` in the platform configuration directory.
//! 3. `scanbridge.toml` in the installation directory.
//! 4. A file passed explicitly (TOML, YAML or JSON, by extension).
//! 5. `SCANBRIDGE_*` environment variables, with `__` between nested keys
//!    (`SCANBRIDGE_NAPS2__TIMEOUT_SECS=300`).
//!
//! Relative paths are resolved against the installation directory. Loading
//! never touches the filesystem beyond reading; creating the output and log
//! directories is left to [`Config::ensure_directories`].

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FILE_NAME: &str = "scanbridge.toml";
pub const ENV_PREFIX: &str = "SCANBRIDGE_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Naps2Config {
    /// Path to `NAPS2.Console.exe`.
    pub console: PathBuf,
    /// NAPS2's data directory, home of `profiles.xml`.
    pub data_dir: PathBuf,
    /// Kill the console after this many seconds. Unset means wait forever.
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiaConfig {
    /// Look up WIA device IDs after listing devices.
    pub enabled: bool,
    /// The enumeration script handed to PowerShell.
    pub script: PathBuf,
    /// PowerShell executable; found on `PATH` when unset.
    pub shell: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// How many scans may run at once.
    pub concurrency: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter; `RUST_LOG` takes precedence.
    pub level: String,
    pub directory: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub naps2: Naps2Config,
    pub wia: WiaConfig,
    /// Where scan output is written.
    pub scans_dir: PathBuf,
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// The built-in defaults for an installation rooted at `base`.
    pub fn defaults(base: &Path) -> Self {
        let naps2 = base.join("naps2");
        Self {
            naps2: Naps2Config {
                console: naps2.join("App").join("NAPS2.Console.exe"),
                data_dir: naps2.join("Data"),
                timeout_secs: None,
            },
            wia: WiaConfig { enabled: true, script: base.join("scripts").join("list-wia-devices.ps1"), shell: None },
            scans_dir: base.join("scans"),
            scan: ScanConfig { concurrency: 1 },
            logging: LoggingConfig { level: "info".to_string(), directory: base.join("logs") },
        }
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.naps2.data_dir.join("profiles.xml")
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.naps2.timeout_secs.map(Duration::from_secs)
    }

    /// Create the directories this process writes into.
    pub fn ensure_directories(&self) -> Result<()> {
        for directory in [&self.scans_dir, &self.logging.directory] {
            std::fs::create_dir_all(directory).or_raise(|| ErrorKind::Io(directory.clone()))?;
        }
        Ok(())
    }

    fn resolve(mut self, base: &Path) -> Self {
        let paths = [
            &mut self.naps2.console,
            &mut self.naps2.data_dir,
            &mut self.wia.script,
            &mut self.scans_dir,
            &mut self.logging.directory,
        ];
        for path in paths {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }
}

/// Builds a [`Config`] from every source.
#[derive(Clone, Debug)]
pub struct ConfigLoader {
    base: PathBuf,
    file: Option<PathBuf>,
    platform_dir: bool,
}

impl ConfigLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into(), file: None, platform_dir: true }
    }

    /// A loader rooted at the directory of the running executable.
    pub fn for_executable() -> Result<Self> {
        let exe = std::env::current_exe().or_raise(|| ErrorKind::NoBaseDirectory)?;
        let base = exe.parent().ok_or_raise(|| ErrorKind::NoBaseDirectory)?;
        Ok(Self::new(base))
    }

    /// Also read `path`, which must exist.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skip the platform configuration directory.
    pub fn without_platform_dir(mut self) -> Self {
        self.platform_dir = false;
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::defaults(&self.base)));
        if self.platform_dir
            && let Some(dirs) = ProjectDirs::from("", "", "scanbridge")
        {
            figment = figment.merge(Toml::file(dirs.config_dir().join(FILE_NAME)));
        }
        figment = figment.merge(Toml::file(self.base.join(FILE_NAME)));
        if let Some(file) = &self.file {
            if !file.is_file() {
                exn::bail!(ErrorKind::MissingFile(file.clone()));
            }
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.clone())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn load(&self) -> Result<Config> {
        let config: Config = self.figment()?.extract().or_raise(|| ErrorKind::Invalid)?;
        tracing::debug!(base = %self.base.display(), "Configuration loaded");
        Ok(config.resolve(&self.base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn load(loader: ConfigLoader) -> figment::error::Result<Config> {
        loader.without_platform_dir().load().map_err(|err| {
            let kind: &ErrorKind = &err;
            figment::Error::from(kind.to_string())
        })
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            let config = load(ConfigLoader::new(jail.directory()))?;
            let base = jail.directory();
            assert_eq!(config, Config::defaults(base));
            assert_eq!(config.naps2.console, base.join("naps2/App/NAPS2.Console.exe"));
            assert_eq!(config.profiles_path(), base.join("naps2/Data/profiles.xml"));
            assert_eq!(config.timeout(), None);
            Ok(())
        });
    }

    #[test]
    fn test_file_next_to_executable() {
        Jail::expect_with(|jail| {
            jail.create_file(
                FILE_NAME,
                r#"
                scans_dir = "output"

                [naps2]
                console = "portable/NAPS2.Console.exe"
                timeout_secs = 600
                "#,
            )?;
            let config = load(ConfigLoader::new(jail.directory()))?;
            assert_eq!(config.scans_dir, jail.directory().join("output"));
            assert_eq!(config.naps2.console, jail.directory().join("portable").join("NAPS2.Console.exe"));
            assert_eq!(config.timeout(), Some(Duration::from_secs(600)));
            // Unspecified keys keep their defaults.
            assert_eq!(config.naps2.data_dir, jail.directory().join("naps2").join("Data"));
            Ok(())
        });
    }

    #[test]
    fn test_environment_wins() {
        Jail::expect_with(|jail| {
            jail.create_file(FILE_NAME, "[scan]\nconcurrency = 2\n[wia]\nenabled = true\n")?;
            jail.set_env("SCANBRIDGE_SCAN__CONCURRENCY", "4");
            jail.set_env("SCANBRIDGE_WIA__ENABLED", "false");
            jail.set_env("SCANBRIDGE_LOGGING__LEVEL", "debug");
            let config = load(ConfigLoader::new(jail.directory()))?;
            assert_eq!(config.scan.concurrency, 4);
            assert!(!config.wia.enabled);
            assert_eq!(config.logging.level, "debug");
            Ok(())
        });
    }

    #[rstest]
    #[case("extra.yaml", "wia:\n  shell: pwsh\n")]
    #[case("extra.json", r#"{"wia": {"shell": "pwsh"}}"#)]
    #[case("extra.toml", "[wia]\nshell = \"pwsh\"\n")]
    fn test_explicit_file(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = load(ConfigLoader::new(jail.directory()).with_file(jail.directory().join(name)))?;
            assert_eq!(config.wia.shell, Some(PathBuf::from("pwsh")));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ConfigLoader::new(dir.path()).without_platform_dir().with_file(dir.path().join("nope.toml"));
        assert!(matches!(&*missing.load().unwrap_err(), ErrorKind::MissingFile(_)));

        let ini = dir.path().join("scanbridge.ini");
        std::fs::write(&ini, "[scan]").unwrap();
        let unsupported = ConfigLoader::new(dir.path()).without_platform_dir().with_file(ini);
        assert!(matches!(&*unsupported.load().unwrap_err(), ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_invalid_value_keeps_cause() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FILE_NAME), "[scan]\nconcurrency = \"several\"\n").unwrap();
        let err = ConfigLoader::new(dir.path()).without_platform_dir().load().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid));
        // The figment error survives as the child, naming the offending key.
        assert!(format!("{err:?}").contains("concurrency"));
    }

    #[test]
    fn test_ensure_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::defaults(dir.path());
        assert!(!config.scans_dir.exists());
        config.ensure_directories().unwrap();
        assert!(config.scans_dir.is_dir());
        assert!(config.logging.directory.is_dir());
        // The NAPS2 installation is never created.
        assert!(!dir.path().join("naps2").exists());
    }
}
