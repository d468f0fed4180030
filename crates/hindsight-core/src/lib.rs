//! Hindsight core — keeps a browsable local mirror of finished-job archives
//! pulled from remote storage locations, after the system that produced them
//! has shut down.
//!
//! A [`MirrorLifecycle`] validates the configured refresh locations, prepares
//! the local mirror root, and runs an [`ArchiveFetcher`] that periodically
//! reconciles each location against the mirror. The serving layer (see the
//! `hindsight-server` crate) reads the mirror root only; it never touches the
//! remote locations.
//!
//! # Example
//!
//! ```rust,ignore
//! use hindsight_core::{MirrorConfig, MirrorLifecycle};
//!
//! #[tokio::main]
//! async fn main() -> hindsight_core::Result<()> {
//!     let config = MirrorConfig::new("file:///data/completed-jobs");
//!     let lifecycle = MirrorLifecycle::new(config, Box::new(my_frontend));
//!     lifecycle.run().await
//! }
//! ```

pub mod archive;
pub mod cancel;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod index;
pub mod lifecycle;
pub mod registry;
pub mod store;

// Re-export commonly used types
pub use archive::{ArchiveBundle, ArchiveEntry, ArchiveRecord};
pub use cancel::CancelFlag;
pub use config::{MirrorConfig, MirrorDefaults};
pub use error::{MirrorError, Result};
pub use fetcher::{ArchiveFetcher, FetcherState, SyncState};
pub use index::{read_overview, write_overview, OverviewEntry, OverviewIndex};
pub use lifecycle::{LifecycleState, MirrorLifecycle, WebFrontend};
pub use registry::{RefreshLocation, RefreshRegistry};
pub use store::{ArchiveStore, FsStore, HttpStore};
