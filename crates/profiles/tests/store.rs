use scanbridge_profiles::error::ErrorKind;
use scanbridge_profiles::{DeviceRef, DeviceUpdate, DriverName, NewProfile, ProfileStore, ProfileUpdate};
use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const FIXTURE: &str = include_str!("fixtures/profiles.xml");
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// A store over a private copy of the fixture document.
fn fixture_store() -> (TempDir, ProfileStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.xml");
    std::fs::write(&path, FIXTURE).unwrap();
    (dir, ProfileStore::new(path))
}

fn on_disk(store: &ProfileStore) -> String {
    std::fs::read_to_string(store.path()).unwrap()
}

fn epson(name: &str) -> NewProfile {
    NewProfile::new(name, DeviceRef { id: "EPSON-DS530".to_string(), name: "Epson DS-530".to_string() })
}

fn office_record(xml: &str) -> &str {
    let start = xml.find("<ScanProfile>").unwrap();
    let end = xml.find("</ScanProfile>").unwrap() + "</ScanProfile>".len();
    &xml[start..end]
}

#[tokio::test]
async fn reads_modelled_fields() {
    let (_dir, store) = fixture_store();
    let profiles = store.list().await.unwrap();
    let names: Vec<_> = profiles.iter().map(|p| p.display_name.as_str()).collect();
    assert_eq!(names, ["Office", "Home"]);

    let home = store.get_by_name("Home").await.unwrap().unwrap();
    assert!(home.is_default);
    assert_eq!(home.driver_name, DriverName::Twain);
    assert_eq!(home.device, DeviceRef { id: "TW-HP-2500".to_string(), name: "HP ScanJet Pro 2500 f1".to_string() });
    assert_eq!(home.paper_source, "Feeder");

    // Lookup is exact and case-sensitive.
    assert_eq!(store.get_by_name("home").await.unwrap(), None);
}

#[tokio::test]
async fn setting_default_moves_flag() {
    let (_dir, store) = fixture_store();
    let update = ProfileUpdate { is_default: Some(true), ..Default::default() };
    let office = store.update("Office", update).await.unwrap();
    assert!(office.is_default);

    let defaults: Vec<_> = store.list().await.unwrap().into_iter().map(|p| (p.display_name, p.is_default)).collect();
    assert_eq!(defaults, [("Office".to_string(), true), ("Home".to_string(), false)]);

    // Nothing else in the document moved.
    let expected = FIXTURE
        .replacen("<IsDefault>false</IsDefault>", "<IsDefault>OFFICE</IsDefault>", 1)
        .replacen("<IsDefault>true</IsDefault>", "<IsDefault>false</IsDefault>", 1)
        .replacen("<IsDefault>OFFICE</IsDefault>", "<IsDefault>true</IsDefault>", 1);
    assert_eq!(on_disk(&store), expected);
}

#[tokio::test]
async fn partial_update_preserves_everything_else() {
    let (_dir, store) = fixture_store();
    let update = ProfileUpdate {
        resolution: Some("Dpi600".to_string()),
        device: Some(DeviceUpdate { id: None, name: Some("Canon LiDE 400".to_string()) }),
        ..Default::default()
    };
    let office = store.update("Office", update).await.unwrap();
    assert_eq!(office.resolution, "Dpi600");
    assert_eq!(office.device.id, "{6BDD1FC6-810F-11D0-BEC7-08002BE2092F}\\0000");
    assert_eq!(office.bit_depth, "Grayscale");

    let expected = FIXTURE
        .replacen("<Resolution>Dpi200</Resolution>", "<Resolution>Dpi600</Resolution>", 1)
        .replacen("<Name>Canon LiDE 300</Name>", "<Name>Canon LiDE 400</Name>", 1);
    assert_eq!(on_disk(&store), expected);
}

#[tokio::test]
async fn rename() {
    let (_dir, store) = fixture_store();
    let update = ProfileUpdate { display_name: Some("Work".to_string()), ..Default::default() };
    store.update("Office", update).await.unwrap();
    assert_eq!(store.get_by_name("Office").await.unwrap(), None);
    assert!(store.get_by_name("Work").await.unwrap().is_some());

    // Renaming a profile to its own name is not a collision.
    let update = ProfileUpdate { display_name: Some("Home".to_string()), ..Default::default() };
    store.update("Home", update).await.unwrap();
}

#[tokio::test]
async fn rename_collision_writes_nothing() {
    let (_dir, store) = fixture_store();
    let update = ProfileUpdate { display_name: Some("Home".to_string()), ..Default::default() };
    let err = store.update("Office", update).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::Duplicate(name) if name == "Home"));
    assert_eq!(on_disk(&store), FIXTURE);
}

#[tokio::test]
async fn create_duplicate_writes_nothing() {
    let (_dir, store) = fixture_store();
    let err = store.create(epson("Office")).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::Duplicate(_)));
    assert_eq!(on_disk(&store), FIXTURE);
}

#[tokio::test]
async fn create_default_profile() {
    let (_dir, store) = fixture_store();
    let created = store.create(NewProfile { is_default: true, ..epson("Receipts") }).await.unwrap();
    assert!(created.is_default);
    assert_eq!(created.driver_name, DriverName::Wia);

    let profiles = store.list().await.unwrap();
    assert_eq!(profiles.len(), 3);
    assert_eq!(profiles.iter().filter(|p| p.is_default).count(), 1);
    assert_eq!(profiles[2], created);

    let xml = on_disk(&store);
    assert_eq!(office_record(&xml), office_record(FIXTURE));
    assert!(xml.ends_with(&format!("\n  {RECEIPTS_RECORD}\n</ArrayOfScanProfile>\n")));
}

/// What a new default profile for the Epson looks like on disk, NAPS2's
/// settings included.
const RECEIPTS_RECORD: &str = r#"<ScanProfile>
    <Version>2</Version>
    <Device>
      <ID>EPSON-DS530</ID>
      <Name>Epson DS-530</Name>
      <IconUri xsi:nil="true" />
      <ConnectionUri xsi:nil="true" />
    </Device>
    <DriverName>wia</DriverName>
    <DisplayName>Receipts</DisplayName>
    <IconID>0</IconID>
    <MaxQuality>false</MaxQuality>
    <IsDefault>true</IsDefault>
    <UseNativeUI>false</UseNativeUI>
    <AfterScanScale>OneToOne</AfterScanScale>
    <Brightness>0</Brightness>
    <Contrast>0</Contrast>
    <BitDepth>C24Bit</BitDepth>
    <PageAlign>Right</PageAlign>
    <PageSize>Letter</PageSize>
    <CustomPageSizeName xsi:nil="true" />
    <CustomPageSize xsi:nil="true" />
    <Resolution>Dpi300</Resolution>
    <PaperSource>Glass</PaperSource>
    <EnableAutoSave>false</EnableAutoSave>
    <AutoSaveSettings xsi:nil="true" />
    <Quality>75</Quality>
    <AutoDeskew>false</AutoDeskew>
    <RotateDegrees>0</RotateDegrees>
    <BrightnessContrastAfterScan>false</BrightnessContrastAfterScan>
    <ForcePageSize>false</ForcePageSize>
    <ForcePageSizeCrop>false</ForcePageSizeCrop>
    <TwainImpl>Default</TwainImpl>
    <TwainProgress>false</TwainProgress>
    <ExcludeBlankPages>false</ExcludeBlankPages>
    <BlankPageWhiteThreshold>70</BlankPageWhiteThreshold>
    <BlankPageCoverageThreshold>25</BlankPageCoverageThreshold>
    <WiaOffsetWidth>false</WiaOffsetWidth>
    <WiaRetryOnFailure>false</WiaRetryOnFailure>
    <WiaDelayBetweenScans>false</WiaDelayBetweenScans>
    <WiaDelayBetweenScansSeconds>2</WiaDelayBetweenScansSeconds>
    <WiaVersion>Default</WiaVersion>
    <FlipDuplexedPages>false</FlipDuplexedPages>
    <KeyValueOptions xsi:nil="true" />
  </ScanProfile>"#;

#[tokio::test]
async fn create_under_bare_root_declares_xsi() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.xml");
    std::fs::write(&path, "<?xml version=\"1.0\"?>\n<ArrayOfScanProfile />").unwrap();
    let store = ProfileStore::new(path);
    store.create(epson("Receipts")).await.unwrap();

    let xml = on_disk(&store);
    let mut reader = NsReader::from_str(&xml);
    let mut nil_attributes = 0;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) | Event::Empty(e) => {
                for attr in e.attributes() {
                    let attr = attr.unwrap();
                    if attr.key.as_ref() == b"xsi:nil" {
                        let (namespace, _) = reader.resolve_attribute(attr.key);
                        assert_eq!(namespace, ResolveResult::Bound(Namespace(XSI_NAMESPACE.as_bytes())));
                        nil_attributes += 1;
                    }
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    assert_eq!(nil_attributes, 6);
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete() {
    let (_dir, store) = fixture_store();
    assert!(!store.delete("Receipts").await.unwrap());
    assert_eq!(on_disk(&store), FIXTURE);

    assert!(store.delete("Office").await.unwrap());
    let expected = FIXTURE.replacen(&format!("\n  {}", office_record(FIXTURE)), "", 1);
    assert_eq!(on_disk(&store), expected);
    let names: Vec<_> = store.list().await.unwrap().into_iter().map(|p| p.display_name).collect();
    assert_eq!(names, ["Home"]);
}

#[tokio::test]
async fn unknown_driver_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("profiles.xml");
    std::fs::write(&path, FIXTURE.replacen("<DriverName>twain</DriverName>", "<DriverName>escl</DriverName>", 1))
        .unwrap();
    let err = ProfileStore::new(path).list().await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::Parse(message) if message.contains("escl")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_are_not_lost() {
    let (_dir, store) = fixture_store();
    let store = Arc::new(store);
    let tasks: Vec<_> = (0..16)
        .map(|n| {
            let store = store.clone();
            tokio::spawn(async move { store.create(epson(&format!("Batch {n}"))).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(store.list().await.unwrap().len(), 18);
    assert_eq!(office_record(&on_disk(&store)), office_record(FIXTURE));
}
