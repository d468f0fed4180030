//! Filesystem-backed archive store.
//!
//! Each archive is a single JSON bundle file in the location directory; the
//! file name is the archive identifier.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;
use url::Url;

use crate::archive::ArchiveBundle;
use crate::error::{MirrorError, Result};
use crate::store::ArchiveStore;

#[derive(Debug, Default)]
pub struct FsStore;

impl FsStore {
    pub fn new() -> Self {
        Self
    }

    fn local_path(location: &Url) -> Result<PathBuf> {
        location.to_file_path().map_err(|()| MirrorError::Config {
            message: format!("'{location}' is not a local path"),
        })
    }
}

#[async_trait]
impl ArchiveStore for FsStore {
    async fn list(&self, location: &Url) -> Result<Vec<String>> {
        let dir = Self::local_path(location)?;
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| MirrorError::io_with_path(e, &dir))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MirrorError::io_with_path(e, &dir))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| MirrorError::io_with_path(e, entry.path()))?;
            if !file_type.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => ids.push(name),
                Err(name) => warn!("Skipping archive with non-UTF-8 name {:?}", name),
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn fetch(&self, location: &Url, id: &str) -> Result<ArchiveBundle> {
        let path = Self::local_path(location)?.join(id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| MirrorError::io_with_path(e, &path))?;
        let bundle = serde_json::from_slice(&bytes)?;
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn location_for(dir: &TempDir) -> Url {
        Url::from_file_path(dir.path()).unwrap()
    }

    #[tokio::test]
    async fn test_list_returns_sorted_file_names() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("job-b"), "{\"archive\":[]}").unwrap();
        std::fs::write(dir.path().join("job-a"), "{\"archive\":[]}").unwrap();
        std::fs::create_dir(dir.path().join("not-an-archive")).unwrap();

        let ids = FsStore::new().list(&location_for(&dir)).await.unwrap();
        assert_eq!(ids, vec!["job-a", "job-b"]);
    }

    #[tokio::test]
    async fn test_list_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let location = Url::from_file_path(dir.path().join("gone")).unwrap();

        let result = FsStore::new().list(&location).await;
        assert!(matches!(result, Err(MirrorError::Io { .. })));
    }

    #[tokio::test]
    async fn test_fetch_decodes_bundle() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("job-a"),
            r#"{"archive":[{"path":"/jobs/overview","json":"{}"}]}"#,
        )
        .unwrap();

        let bundle = FsStore::new()
            .fetch(&location_for(&dir), "job-a")
            .await
            .unwrap();
        assert_eq!(bundle.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_corrupt_bundle_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("job-a"), "not json").unwrap();

        let result = FsStore::new().fetch(&location_for(&dir), "job-a").await;
        assert!(matches!(result, Err(MirrorError::Json { .. })));
    }
}
