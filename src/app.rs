use crate::cli::{Command, ProfilesCommand};
use crate::response::{IntoResponse, Response};
use exn::Exn;
use scanbridge_config::{Config, WiaConfig};
use scanbridge_console::{Decoding, ProcessBridge, RunnerHandle, discover};
use scanbridge_devices::{DeviceCatalog, DeviceLister, WiaResolver};
use scanbridge_profiles::ProfileStore;
use scanbridge_profiles::error::ErrorKind as ProfileError;
use scanbridge_scan::Scanner;
use serde::Serialize;
use std::error::Error as StdError;
use std::sync::Arc;

/// Every component, constructed once and shared by the commands.
pub struct App {
    catalog: DeviceCatalog,
    profiles: Arc<ProfileStore>,
    scanner: Scanner,
}

impl App {
    pub fn new(catalog: DeviceCatalog, profiles: Arc<ProfileStore>, scanner: Scanner) -> Self {
        Self { catalog, profiles, scanner }
    }

    pub fn from_config(config: &Config) -> Self {
        let console_path = &config.naps2.console;
        if console_path.is_file() {
            tracing::info!(console = %console_path.display(), "Using NAPS2 console");
        } else {
            tracing::warn!(console = %console_path.display(), "NAPS2 console not found; scanning will fail");
        }
        let console: RunnerHandle = Arc::new(ProcessBridge::new(console_path).with_timeout(config.timeout()));

        let resolver = wia_shell(&config.wia).map(|shell| WiaResolver::new(shell, &config.wia.script));
        let catalog = DeviceCatalog::new(DeviceLister::new(console.clone()), resolver);
        let profiles = Arc::new(ProfileStore::new(config.profiles_path()));
        let scanner =
            Scanner::new(console, profiles.clone(), &config.scans_dir).with_concurrency(config.scan.concurrency);
        Self::new(catalog, profiles, scanner)
    }

    pub async fn handle(&self, command: Command) -> Response {
        match command {
            Command::Devices { driver } => respond(self.catalog.list(driver).await),
            Command::Profiles(ProfilesCommand::List) => respond(self.profiles.list().await),
            Command::Profiles(ProfilesCommand::Get { name }) => match self.profiles.get_by_name(&name).await {
                Ok(Some(profile)) => Response::ok(profile),
                Ok(None) => ProfileError::NotFound(name).into_response(),
                Err(err) => failure(&err),
            },
            Command::Profiles(ProfilesCommand::Create(args)) => respond(self.profiles.create(args.into()).await),
            Command::Profiles(ProfilesCommand::Update(args)) => {
                let (name, update) = args.into_update();
                respond(self.profiles.update(&name, update).await)
            },
            Command::Profiles(ProfilesCommand::Delete { name }) => match self.profiles.delete(&name).await {
                Ok(true) => Response::ok(serde_json::json!({ "deleted": name })),
                Ok(false) => ProfileError::NotFound(name).into_response(),
                Err(err) => failure(&err),
            },
            Command::Scan(args) => respond(self.scanner.scan(args.into()).await),
        }
    }
}

/// The PowerShell host for WIA enrichment, or `None` when enrichment is off
/// or there's no PowerShell to run it with.
fn wia_shell(config: &WiaConfig) -> Option<RunnerHandle> {
    if !config.enabled {
        return None;
    }
    let shell = match &config.shell {
        Some(shell) => shell.clone(),
        None => match discover(&["powershell", "pwsh"]) {
            Ok(shell) => shell,
            Err(err) => {
                let kind: &scanbridge_console::error::ErrorKind = &err;
                tracing::warn!(error = %kind, "WIA device IDs will not be available");
                return None;
            },
        },
    };
    Some(Arc::new(ProcessBridge::new(shell).with_working_dir(None).with_decoding(Decoding::Utf8Lossy)))
}

fn respond<T, K>(result: Result<T, Exn<K>>) -> Response
where
    T: Serialize,
    K: IntoResponse + StdError + Send + Sync + 'static,
{
    match result {
        Ok(data) => Response::ok(data),
        Err(err) => failure(&err),
    }
}

fn failure<K>(err: &Exn<K>) -> Response
where
    K: IntoResponse + StdError + Send + Sync + 'static,
{
    tracing::error!(error = ?err, "Command failed");
    let kind: &K = err;
    kind.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CreateArgs, ScanArgs, UpdateArgs};
    use crate::response::Status;
    use scanbridge_console::{CommandOutcome, MockRunner};
    use scanbridge_devices::Driver;
    use scanbridge_profiles::DriverName;
    use serde_json::json;
    use tempfile::TempDir;

    /// An app whose console lists one WIA scanner and whose scans always fail.
    fn app(dir: &TempDir) -> (App, Arc<MockRunner>) {
        let console = Arc::new(MockRunner::new(|args| {
            Ok(match args.first().map(String::as_str) {
                Some("--listdevices") => CommandOutcome::ok("Available devices:\r\n\r\nCanon LiDE 300\r\n"),
                _ => CommandOutcome::failed(1, "Device is offline."),
            })
        }));
        let profiles = Arc::new(ProfileStore::new(dir.path().join("profiles.xml")));
        let catalog = DeviceCatalog::new(DeviceLister::new(console.clone()), None);
        let scanner = Scanner::new(console.clone(), profiles.clone(), dir.path());
        (App::new(catalog, profiles, scanner), console)
    }

    fn create(name: &str) -> Command {
        Command::Profiles(ProfilesCommand::Create(CreateArgs {
            name: name.to_string(),
            device_id: "dev-1".to_string(),
            device_name: "Canon LiDE 300".to_string(),
            driver: DriverName::Wia,
            default: false,
            bit_depth: None,
            page_size: None,
            resolution: None,
            paper_source: None,
        }))
    }

    #[tokio::test]
    async fn test_devices() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(&dir);
        let response = app.handle(Command::Devices { driver: Some(Driver::Wia) }).await;
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": true, "data": [{"id": "", "name": "Canon LiDE 300", "driver": "wia"}]})
        );
    }

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(&dir);

        assert_eq!(app.handle(create("Office")).await.status, Status::Ok);
        assert_eq!(app.handle(create("Office")).await.status, Status::Conflict);

        let get = app.handle(Command::Profiles(ProfilesCommand::Get { name: "Office".to_string() })).await;
        assert_eq!(get.data.unwrap()["device"]["name"], "Canon LiDE 300");

        let update = UpdateArgs {
            name: "Office".to_string(),
            rename: Some(String::new()),
            default: None,
            device_id: None,
            device_name: None,
            driver: None,
            bit_depth: None,
            page_size: None,
            resolution: None,
            paper_source: None,
        };
        let response = app.handle(Command::Profiles(ProfilesCommand::Update(update))).await;
        assert_eq!(response.status, Status::BadRequest);

        let delete = |name: &str| Command::Profiles(ProfilesCommand::Delete { name: name.to_string() });
        assert_eq!(app.handle(delete("Office")).await.status, Status::Ok);
        assert_eq!(app.handle(delete("Office")).await.status, Status::NotFound);
        let list = app.handle(Command::Profiles(ProfilesCommand::List)).await;
        assert_eq!(list.data, Some(json!([])));
    }

    #[tokio::test]
    async fn test_scan_failure_details() {
        let dir = tempfile::tempdir().unwrap();
        let (app, console) = app(&dir);
        let args = ScanArgs {
            profile: None,
            driver: Some(Driver::Wia),
            device: Some("Canon LiDE 300".to_string()),
            source: None,
            dpi: None,
            bit_depth: None,
            page_size: None,
            format: None,
            count: None,
        };
        let response = app.handle(Command::Scan(args)).await;
        assert_eq!(response.status, Status::Internal);
        assert_eq!(response.error.as_deref(), Some("Scan failed: Device is offline."));
        assert_eq!(response.details.map(|d| d.code), Some(1));
        assert_eq!(console.calls().len(), 1);
    }

    #[test]
    fn test_wia_shell_disabled() {
        let config = WiaConfig { enabled: false, script: "list-wia-devices.ps1".into(), shell: Some("pwsh".into()) };
        assert!(wia_shell(&config).is_none());
        let config = WiaConfig { enabled: true, ..config };
        assert!(wia_shell(&config).is_some());
    }
}
