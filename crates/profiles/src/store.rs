use crate::error::{ErrorKind, Result};
use crate::{NewProfile, ProfileDocument, ProfileUpdate, RawProfile, ScanProfile};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::instrument;

/// CRUD over NAPS2's `profiles.xml`.
///
/// Nothing is cached: every call reads the document from disk, and every
/// mutation writes the whole document back. Mutations are serialised by a
/// lock owned by the store, so share one store (behind an `Arc`) between
/// everything that writes to the same file. Reads skip the lock; writes
/// replace the file atomically so a reader sees either the old or the new
/// document, never a partial one.
pub struct ProfileStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), writer: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing file is an empty document.
    async fn load(&self) -> Result<ProfileDocument> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(ProfileDocument::default()),
            Err(err) => return Err(err).or_raise(|| ErrorKind::Io(self.path.clone())),
        };
        let source =
            String::from_utf8(bytes).or_raise(|| ErrorKind::Parse("document is not valid UTF-8".to_string()))?;
        ProfileDocument::parse(&source)
    }

    async fn save(&self, document: &ProfileDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
        }
        let mut temporary = self.path.clone().into_os_string();
        temporary.push(".tmp");
        let temporary = PathBuf::from(temporary);
        fs::write(&temporary, document.to_xml()).await.or_raise(|| ErrorKind::Io(temporary.clone()))?;
        fs::rename(&temporary, &self.path).await.or_raise(|| ErrorKind::Io(self.path.clone()))?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ScanProfile>> {
        self.load().await?.profiles().map(RawProfile::to_profile).collect()
    }

    /// The profile whose display name is exactly `name`, if any.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<ScanProfile>> {
        self.load().await?.find(name).map(RawProfile::to_profile).transpose()
    }

    /// Add a profile. Making it the default takes the default flag away from
    /// every other profile in the same write.
    #[instrument(skip_all, fields(profile = %input.display_name))]
    pub async fn create(&self, input: NewProfile) -> Result<ScanProfile> {
        input.validate().map_err(ErrorKind::Validation)?;
        let _guard = self.writer.lock().await;
        let mut document = self.load().await?;
        if document.find(&input.display_name).is_some() {
            exn::bail!(ErrorKind::Duplicate(input.display_name));
        }
        if input.is_default {
            document.profiles_mut().for_each(RawProfile::clear_default);
        }
        let record = RawProfile::from_new(&input);
        let profile = record.to_profile()?;
        document.push(record);
        self.save(&document).await?;
        tracing::info!("Profile created");
        Ok(profile)
    }

    /// Change the fields present in `update`, leaving everything else in the
    /// record exactly as it was.
    #[instrument(skip(self, update))]
    pub async fn update(&self, name: &str, update: ProfileUpdate) -> Result<ScanProfile> {
        update.validate().map_err(ErrorKind::Validation)?;
        let _guard = self.writer.lock().await;
        let mut document = self.load().await?;
        if document.find(name).is_none() {
            exn::bail!(ErrorKind::NotFound(name.to_string()));
        }
        if let Some(renamed) = update.display_name.as_deref()
            && renamed != name
            && document.find(renamed).is_some()
        {
            exn::bail!(ErrorKind::Duplicate(renamed.to_string()));
        }
        if update.is_default == Some(true) {
            document
                .profiles_mut()
                .filter(|record| record.display_name() != Some(name))
                .for_each(RawProfile::clear_default);
        }
        let record = document.find_mut(name).ok_or_raise(|| ErrorKind::NotFound(name.to_string()))?;
        record.apply(&update);
        let profile = record.to_profile()?;
        self.save(&document).await?;
        tracing::info!(renamed = ?update.display_name, "Profile updated");
        Ok(profile)
    }

    /// Remove a profile. Returns `false`, without writing, if there was no
    /// profile called `name`.
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let _guard = self.writer.lock().await;
        let mut document = self.load().await?;
        if !document.remove(name) {
            return Ok(false);
        }
        self.save(&document).await?;
        tracing::info!("Profile deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceRef;
    use tempfile::tempdir;

    fn canon(name: &str) -> NewProfile {
        NewProfile::new(name, DeviceRef { id: "dev-1".to_string(), name: "Canon LiDE 300".to_string() })
    }

    #[tokio::test]
    async fn test_missing_document_is_empty() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles.xml"));
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.get_by_name("Office").await.unwrap(), None);
        assert!(!store.delete("Office").await.unwrap());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_create_makes_parent_directory() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("Data").join("profiles.xml"));
        let created = store.create(canon("Office")).await.unwrap();
        assert_eq!(store.get_by_name("Office").await.unwrap(), Some(created));
        assert!(!dir.path().join("Data").join("profiles.xml.tmp").exists());
    }

    #[tokio::test]
    async fn test_invalid_input_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles.xml"));
        let err = store.create(canon("")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Validation(_)));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_update_missing_profile() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles.xml"));
        let err = store.update("Office", ProfileUpdate::default()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(name) if name == "Office"));
    }

    #[tokio::test]
    async fn test_non_utf8_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profiles.xml");
        std::fs::write(&path, b"<ArrayOfScanProfile>\xff</ArrayOfScanProfile>").unwrap();
        let err = ProfileStore::new(path).list().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse(_)));
    }
}
