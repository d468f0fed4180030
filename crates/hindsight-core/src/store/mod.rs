//! Storage backends for remote archive locations.
//!
//! A backend knows how to list the archive identifiers present at a location
//! and fetch one archive's payload. Backends are resolved from the location's
//! scheme at registry construction time and shared behind `Arc`.

mod fs;
mod http;

pub use fs::FsStore;
pub use http::HttpStore;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::archive::ArchiveBundle;
use crate::error::{MirrorError, Result};

/// A storage backend able to list and read one kind of archive location.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// List the archive identifiers currently present at `location`.
    async fn list(&self, location: &Url) -> Result<Vec<String>>;

    /// Fetch the archive payload for `id` at `location`.
    async fn fetch(&self, location: &Url, id: &str) -> Result<ArchiveBundle>;
}

/// Resolve the storage backend for a normalized location URL.
pub fn for_scheme(url: &Url) -> Result<Arc<dyn ArchiveStore>> {
    match url.scheme() {
        "file" => Ok(Arc::new(FsStore::new())),
        "http" | "https" => Ok(Arc::new(HttpStore::new()?)),
        other => Err(MirrorError::Config {
            message: format!("Unsupported archive location scheme '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_resolution() {
        assert!(for_scheme(&Url::parse("file:///archives").unwrap()).is_ok());
        assert!(for_scheme(&Url::parse("http://archive-host/jobs").unwrap()).is_ok());
        assert!(for_scheme(&Url::parse("https://archive-host/jobs").unwrap()).is_ok());
        assert!(matches!(
            for_scheme(&Url::parse("ftp://archive-host/jobs").unwrap()),
            Err(MirrorError::Config { .. })
        ));
    }
}
