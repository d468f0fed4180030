//! Background synchronization of remote archives into the local mirror.
//!
//! The fetcher runs one refresh cycle per interval tick. A cycle reconciles
//! each refresh location independently: new archives are materialized,
//! vanished archives are deleted, and the overview index is regenerated
//! atomically at the end. One unreachable location or one corrupt archive
//! never blocks visibility of the rest.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::archive::{validate_archive_id, validate_entry_path, ArchiveBundle, ArchiveRecord};
use crate::cancel::CancelFlag;
use crate::config::MirrorDefaults;
use crate::error::{MirrorError, Result};
use crate::index::{write_overview, OverviewIndex};
use crate::registry::{RefreshLocation, RefreshRegistry};

/// Fetcher lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FetcherState {
    Idle = 0,
    CycleRunning = 1,
    Stopping = 2,
    Stopped = 3,
}

impl FetcherState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => FetcherState::Idle,
            1 => FetcherState::CycleRunning,
            2 => FetcherState::Stopping,
            _ => FetcherState::Stopped,
        }
    }
}

/// Owns the periodic refresh loop.
///
/// `start` spawns the background task; `stop` requests cooperative
/// cancellation and waits for the in-flight cycle (if any) to observe it.
/// Cancellation is checked between refresh locations, so stopping is bounded
/// by the time to finish at most one location, not a whole cycle.
pub struct ArchiveFetcher {
    registry: Arc<RefreshRegistry>,
    web_dir: PathBuf,
    interval: Duration,
    cancel: CancelFlag,
    wake: Arc<Notify>,
    state: Arc<AtomicU8>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ArchiveFetcher {
    pub fn new(
        registry: Arc<RefreshRegistry>,
        web_dir: impl Into<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            web_dir: web_dir.into(),
            interval,
            cancel: CancelFlag::new(),
            wake: Arc::new(Notify::new()),
            state: Arc::new(AtomicU8::new(FetcherState::Idle as u8)),
            handle: Mutex::new(None),
        }
    }

    pub fn state(&self) -> FetcherState {
        FetcherState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Spawn the recurring refresh loop. A second call is a no-op.
    pub async fn start(&self) {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return;
        }

        let mut sync = SyncState::new(self.registry.clone(), self.web_dir.clone());
        let cancel = self.cancel.clone();
        let wake = self.wake.clone();
        let state = self.state.clone();
        let interval = self.interval;

        *handle = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the first tick completes immediately; the first cycle runs now
            timer.tick().await;

            loop {
                if cancel.is_cancelled() {
                    break;
                }
                state.store(FetcherState::CycleRunning as u8, Ordering::SeqCst);
                match sync.run_cycle(&cancel).await {
                    Ok(()) => {}
                    Err(MirrorError::Cancelled) => break,
                    Err(e) => warn!("Archive refresh cycle failed: {}", e),
                }
                state.store(FetcherState::Idle as u8, Ordering::SeqCst);
                if cancel.is_cancelled() {
                    break;
                }
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = wake.notified() => {}
                }
            }
            state.store(FetcherState::Stopped as u8, Ordering::SeqCst);
            debug!("Archive refresh loop exited");
        }));
    }

    /// Request cancellation and wait for the loop to exit. Idempotent.
    pub async fn stop(&self) {
        let handle = self.handle.lock().await.take();
        let Some(handle) = handle else {
            self.state
                .store(FetcherState::Stopped as u8, Ordering::SeqCst);
            return;
        };

        self.state
            .store(FetcherState::Stopping as u8, Ordering::SeqCst);
        self.cancel.cancel();
        self.wake.notify_one();
        if let Err(e) = handle.await {
            warn!("Archive refresh task did not shut down cleanly: {}", e);
        }
        self.state
            .store(FetcherState::Stopped as u8, Ordering::SeqCst);
    }
}

/// Mutable synchronization state owned by the refresh loop.
///
/// Public so single cycles can be driven without the timer; the background
/// loop is a thin scheduler around [`SyncState::run_cycle`].
pub struct SyncState {
    registry: Arc<RefreshRegistry>,
    web_dir: PathBuf,
    records: HashMap<String, ArchiveRecord>,
    cycle: u64,
}

impl SyncState {
    pub fn new(registry: Arc<RefreshRegistry>, web_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            web_dir: web_dir.into(),
            records: HashMap::new(),
            cycle: 0,
        }
    }

    /// Archives currently known to the mirror.
    pub fn records(&self) -> &HashMap<String, ArchiveRecord> {
        &self.records
    }

    /// One complete pass over all refresh locations.
    ///
    /// Per-location and per-archive failures are logged and contained; the
    /// only error this returns is `Cancelled`, raised at the safe point
    /// between locations. The overview index is regenerated even when some
    /// locations failed, so it always matches the record set.
    pub async fn run_cycle(&mut self, cancel: &CancelFlag) -> Result<()> {
        self.cycle += 1;
        debug!("Starting refresh cycle {}", self.cycle);

        let registry = self.registry.clone();
        for location in registry.locations() {
            cancel.check()?;
            if let Err(e) = self.sync_location(location).await {
                warn!(
                    "Failed to refresh archives from {}: {}",
                    location.url(),
                    e
                );
            }
        }

        let index = OverviewIndex::from_records(self.records.values());
        write_overview(&self.web_dir, &index)
    }

    /// Reconcile one refresh location against the mirror.
    async fn sync_location(&mut self, location: &RefreshLocation) -> Result<()> {
        let listed = location.store().list(location.url()).await?;
        let listed_ids: HashSet<&str> = listed.iter().map(String::as_str).collect();

        for id in &listed {
            if let Err(e) = validate_archive_id(id) {
                warn!("Skipping archive at {}: {}", location.url(), e);
                continue;
            }
            if let Some(record) = self.records.get_mut(id) {
                record.location = location.url().clone();
                record.last_synced = self.cycle;
                continue;
            }
            match self.materialize(location, id).await {
                Ok(()) => {
                    info!("Mirrored new archive {} from {}", id, location.url());
                    self.records.insert(
                        id.clone(),
                        ArchiveRecord {
                            id: id.clone(),
                            location: location.url().clone(),
                            last_synced: self.cycle,
                        },
                    );
                }
                Err(e) => {
                    warn!(
                        "Failed to mirror archive {} from {}: {}",
                        id,
                        location.url(),
                        e
                    );
                }
            }
        }

        // Archives recorded at this location but no longer listed there. The
        // record survives a failed deletion so the next cycle retries it.
        let vanished: Vec<String> = self
            .records
            .values()
            .filter(|record| {
                record.location == *location.url() && !listed_ids.contains(record.id.as_str())
            })
            .map(|record| record.id.clone())
            .collect();

        for id in vanished {
            match self.delete_mirrored(&id).await {
                Ok(()) => {
                    info!(
                        "Removed archive {} no longer present at {}",
                        id,
                        location.url()
                    );
                    self.records.remove(&id);
                }
                Err(e) => {
                    warn!("Failed to delete mirrored archive {}: {}", id, e);
                }
            }
        }

        Ok(())
    }

    /// Fetch an archive and move it into the mirror.
    ///
    /// The bundle is written into a staging directory and renamed into place,
    /// so a concurrent reader never observes a partially-written archive.
    async fn materialize(&self, location: &RefreshLocation, id: &str) -> Result<()> {
        let bundle = location.store().fetch(location.url(), id).await?;

        let jobs_dir = self.web_dir.join(MirrorDefaults::JOBS_DIR);
        let staging = jobs_dir.join(format!("{id}{}", MirrorDefaults::STAGING_SUFFIX));
        let target = jobs_dir.join(id);

        remove_dir_if_present(&staging).await?;
        if let Err(e) = self.write_bundle(&staging, &bundle).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        remove_dir_if_present(&target).await?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|e| MirrorError::io_with_path(e, &target))
    }

    async fn write_bundle(&self, staging: &std::path::Path, bundle: &ArchiveBundle) -> Result<()> {
        tokio::fs::create_dir_all(staging)
            .await
            .map_err(|e| MirrorError::io_with_path(e, staging))?;

        for entry in &bundle.entries {
            let relative = validate_entry_path(&entry.path)?;
            let dest = staging.join(relative);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| MirrorError::io_with_path(e, parent))?;
            }
            tokio::fs::write(&dest, entry.json.as_bytes())
                .await
                .map_err(|e| MirrorError::io_with_path(e, &dest))?;
        }
        Ok(())
    }

    async fn delete_mirrored(&self, id: &str) -> Result<()> {
        let dir = self.web_dir.join(MirrorDefaults::JOBS_DIR).join(id);
        remove_dir_if_present(&dir).await
    }
}

async fn remove_dir_if_present(dir: &std::path::Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MirrorError::io_with_path(e, dir)),
    }
}
