//! Validation and construction of the refresh-location set.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;
use url::Url;

use crate::config::MirrorDefaults;
use crate::error::{MirrorError, Result};
use crate::store::{self, ArchiveStore};

/// One remote location scanned for archives: its normalized URL and the
/// storage backend able to list and read it.
#[derive(Clone)]
pub struct RefreshLocation {
    url: Url,
    store: Arc<dyn ArchiveStore>,
}

impl RefreshLocation {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn store(&self) -> &Arc<dyn ArchiveStore> {
        &self.store
    }
}

impl std::fmt::Debug for RefreshLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshLocation")
            .field("url", &self.url.as_str())
            .finish()
    }
}

/// Immutable set of refresh locations, validated once at startup.
pub struct RefreshRegistry {
    locations: Vec<RefreshLocation>,
}

impl RefreshRegistry {
    /// Build the registry from a comma-separated location list.
    ///
    /// Entries that fail normalization or backend resolution are dropped with
    /// a warning; only an empty result is a configuration error.
    pub fn build(raw: &str) -> Result<Self> {
        let mut locations = Vec::new();
        for entry in raw.split(MirrorDefaults::LOCATION_DELIMITER) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match Self::resolve(entry) {
                Ok(location) => locations.push(location),
                Err(e) => {
                    warn!(
                        "Failed to resolve archive location '{}', it will not be monitored: {}",
                        entry, e
                    );
                }
            }
        }

        if locations.is_empty() {
            return Err(MirrorError::config(
                "none of the configured archive locations are usable",
            ));
        }
        Ok(Self { locations })
    }

    fn resolve(entry: &str) -> Result<RefreshLocation> {
        let url = normalize_location(entry)?;
        let store = store::for_scheme(&url)?;
        Ok(RefreshLocation { url, store })
    }

    pub fn locations(&self) -> &[RefreshLocation] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Normalize a raw location entry into a URL.
///
/// Trailing slashes are stripped and bare paths become `file` URLs, made
/// absolute against the current directory when necessary.
fn normalize_location(entry: &str) -> Result<Url> {
    let trimmed = entry.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(MirrorError::config("location is empty"));
    }
    match Url::parse(trimmed) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = Path::new(trimmed);
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map_err(|e| MirrorError::io_with_path(e, path))?
                    .join(path)
            };
            Url::from_file_path(&absolute).map_err(|()| MirrorError::Config {
                message: format!("'{entry}' cannot be expressed as a file URL"),
            })
        }
        Err(e) => Err(MirrorError::Config {
            message: format!("'{entry}' is not a valid location: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_path_becomes_file_url() {
        let url = normalize_location("/data/archives/").unwrap();
        assert_eq!(url.scheme(), "file");
        assert_eq!(url.path(), "/data/archives");
    }

    #[test]
    fn test_trailing_slash_stripped_from_urls() {
        let url = normalize_location("http://archive-host/jobs/").unwrap();
        assert_eq!(url.as_str(), "http://archive-host/jobs");
    }

    #[test]
    fn test_build_drops_invalid_entries() {
        let registry =
            RefreshRegistry::build("ftp://unsupported/a, /data/archives, http://archive-host/jobs")
                .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_build_fails_when_all_entries_invalid() {
        let result = RefreshRegistry::build("ftp://a, , ftp://b");
        assert!(matches!(result, Err(MirrorError::Config { .. })));
    }

    #[test]
    fn test_build_fails_on_empty_list() {
        assert!(matches!(
            RefreshRegistry::build(""),
            Err(MirrorError::Config { .. })
        ));
    }
}
