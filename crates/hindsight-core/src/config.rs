//! Runtime configuration and defaults for the history mirror.

use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Mirror layout and refresh defaults.
pub struct MirrorDefaults;

impl MirrorDefaults {
    pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);
    pub const WEB_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
    pub const LOCATION_DELIMITER: char = ',';

    /// Static dashboard config artifact, written once at startup.
    pub const CONFIG_FILE: &'static str = "config.json";
    /// Overview index artifact, regenerated every refresh cycle.
    pub const OVERVIEW_FILE: &'static str = "overview.json";
    /// Subdirectory holding one directory per mirrored archive.
    pub const JOBS_DIR: &'static str = "jobs";
    /// Suffix for staging directories while an archive is materialized.
    pub const STAGING_SUFFIX: &'static str = ".part";
}

/// Network-related configuration.
pub struct NetworkDefaults;

impl NetworkDefaults {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
}

/// Runtime configuration for a [`MirrorLifecycle`](crate::MirrorLifecycle).
///
/// Parsing (CLI flags, config files) happens outside the core; this struct is
/// the already-resolved result.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Comma-separated list of remote locations to mirror archives from.
    pub archive_locations: String,
    /// Interval between refresh cycles.
    pub refresh_interval: Duration,
    /// Local mirror root; a temp directory is generated when absent.
    pub web_dir: Option<PathBuf>,
    /// Poll interval hint surfaced to the dashboard in the config artifact.
    pub web_refresh_interval: Duration,
    /// Advertised in the dashboard config artifact; serving stays plain HTTP.
    pub ssl_enabled: bool,
}

impl MirrorConfig {
    pub fn new(archive_locations: impl Into<String>) -> Self {
        Self {
            archive_locations: archive_locations.into(),
            refresh_interval: MirrorDefaults::REFRESH_INTERVAL,
            web_dir: None,
            web_refresh_interval: MirrorDefaults::WEB_REFRESH_INTERVAL,
            ssl_enabled: false,
        }
    }

    /// Resolve the mirror root, generating a fresh temp path when none was
    /// configured.
    pub fn resolve_web_dir(&self) -> PathBuf {
        self.web_dir.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("hindsight-web-{}", Uuid::new_v4()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MirrorConfig::new("file:///archives");
        assert_eq!(config.refresh_interval, MirrorDefaults::REFRESH_INTERVAL);
        assert!(config.web_dir.is_none());
        assert!(!config.ssl_enabled);
    }

    #[test]
    fn test_generated_web_dir_is_unique() {
        let config = MirrorConfig::new("file:///archives");
        let first = config.resolve_web_dir();
        let second = config.resolve_web_dir();
        assert_ne!(first, second);
        assert!(first
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("hindsight-web-"));
    }

    #[test]
    fn test_configured_web_dir_wins() {
        let mut config = MirrorConfig::new("file:///archives");
        config.web_dir = Some(PathBuf::from("/srv/hindsight"));
        assert_eq!(config.resolve_web_dir(), PathBuf::from("/srv/hindsight"));
    }
}
