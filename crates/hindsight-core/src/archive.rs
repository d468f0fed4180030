//! Archive payload model and identifier handling.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::MirrorDefaults;
use crate::error::{MirrorError, Result};

/// One archive known to the mirror.
///
/// Records where the archive was last seen and which refresh cycle last
/// synchronized it. The record is dropped only once the mirrored directory
/// has actually been deleted, so a failed deletion retries automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub id: String,
    pub location: Url,
    pub last_synced: u64,
}

/// Persisted archive payload: a set of relative paths with their JSON bodies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveBundle {
    #[serde(rename = "archive")]
    pub entries: Vec<ArchiveEntry>,
}

/// One file within an archive bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub json: String,
}

/// Validate an archive identifier taken from a remote listing.
///
/// Identifiers become mirror directory names, so anything that could escape
/// the mirror root or collide with a staging directory is rejected.
pub fn validate_archive_id(id: &str) -> Result<()> {
    if id.is_empty()
        || id == "."
        || id == ".."
        || id.contains('/')
        || id.contains('\\')
        || id.ends_with(MirrorDefaults::STAGING_SUFFIX)
    {
        return Err(MirrorError::InvalidArchive {
            message: format!("'{id}' is not a usable archive identifier"),
        });
    }
    Ok(())
}

/// Validate a bundle entry path and return it as a relative path.
///
/// Leading slashes are tolerated (archived REST paths carry them); everything
/// else must be plain relative components.
pub fn validate_entry_path(path: &str) -> Result<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let mut clean = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            _ => {
                return Err(MirrorError::InvalidArchive {
                    message: format!("entry path '{path}' escapes the archive directory"),
                })
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(MirrorError::InvalidArchive {
            message: "entry path is empty".into(),
        });
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifiers_accepted() {
        assert!(validate_archive_id("job-A").is_ok());
        assert!(validate_archive_id("0f92c1d4e8").is_ok());
    }

    #[test]
    fn test_traversal_identifiers_rejected() {
        for id in ["", ".", "..", "a/b", "a\\b", "job.part"] {
            assert!(validate_archive_id(id).is_err(), "accepted {id:?}");
        }
    }

    #[test]
    fn test_entry_paths_normalized() {
        assert_eq!(
            validate_entry_path("/jobs/overview").unwrap(),
            PathBuf::from("jobs/overview")
        );
        assert_eq!(
            validate_entry_path("vertices/summary").unwrap(),
            PathBuf::from("vertices/summary")
        );
    }

    #[test]
    fn test_escaping_entry_paths_rejected() {
        for path in ["", "/", "../secrets", "a/../../b", "./a"] {
            assert!(validate_entry_path(path).is_err(), "accepted {path:?}");
        }
    }

    #[test]
    fn test_bundle_round_trips() {
        let raw = r#"{"archive":[{"path":"/jobs/overview","json":"{}"}]}"#;
        let bundle: ArchiveBundle = serde_json::from_str(raw).unwrap();
        assert_eq!(bundle.entries.len(), 1);
        assert_eq!(bundle.entries[0].path, "/jobs/overview");
    }
}
