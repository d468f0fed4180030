//! Startup and shutdown orchestration for the mirror.
//!
//! The lifecycle controller is the only entry and exit point of the system:
//! it validates the refresh-location registry, prepares the mirror root,
//! starts the archive fetcher, hands the root to the serving layer, and
//! tears everything down in reverse order. The stop sequence is gated by an
//! atomic one-shot flag so that an explicit `stop` call and a termination
//! signal racing each other run cleanup exactly once.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{MirrorConfig, MirrorDefaults};
use crate::error::{MirrorError, Result};
use crate::fetcher::ArchiveFetcher;
use crate::registry::RefreshRegistry;

/// Serving layer consumed by the lifecycle controller.
///
/// The controller guarantees that `start` is called with an existing mirror
/// root, and that `stop` has been called before the root is deleted. Files
/// under the root are replaced atomically, so serving them read-only is safe
/// while a refresh cycle is in progress.
#[async_trait]
pub trait WebFrontend: Send {
    async fn start(&mut self, web_root: &Path) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
}

/// Controller lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    New,
    Running,
    Stopped,
}

/// Dashboard config payload, written once at startup as `config.json`.
#[derive(Debug, Serialize)]
struct DashboardConfig {
    #[serde(rename = "refresh-interval")]
    refresh_interval_ms: u64,
    #[serde(rename = "hindsight-version")]
    version: &'static str,
    #[serde(rename = "ssl-enabled")]
    ssl_enabled: bool,
}

/// Brings the mirror into existence and guarantees cleanup on every exit
/// path.
pub struct MirrorLifecycle {
    shared: Arc<Shared>,
}

struct Shared {
    config: MirrorConfig,
    web_dir: PathBuf,
    /// One-shot gate shared by the explicit-stop and signal-stop paths.
    shutdown_requested: AtomicBool,
    /// Startup/shutdown mutual-exclusion section: a `start` racing a `stop`
    /// can never interleave their sub-steps.
    guarded: Mutex<Guarded>,
}

struct Guarded {
    state: LifecycleState,
    frontend: Box<dyn WebFrontend>,
    fetcher: Option<ArchiveFetcher>,
    termination_hook: Option<JoinHandle<()>>,
}

impl MirrorLifecycle {
    pub fn new(config: MirrorConfig, frontend: Box<dyn WebFrontend>) -> Self {
        let web_dir = config.resolve_web_dir();
        Self {
            shared: Arc::new(Shared {
                config,
                web_dir,
                shutdown_requested: AtomicBool::new(false),
                guarded: Mutex::new(Guarded {
                    state: LifecycleState::New,
                    frontend,
                    fetcher: None,
                    termination_hook: None,
                }),
            }),
        }
    }

    /// The local mirror root served by the frontend.
    pub fn web_dir(&self) -> &Path {
        &self.shared.web_dir
    }

    pub async fn state(&self) -> LifecycleState {
        self.shared.guarded.lock().await.state
    }

    /// Validate configuration, prepare the mirror root, and start the
    /// fetcher and the serving layer. Also registers a termination hook so
    /// an external termination request invokes [`stop`](Self::stop).
    pub async fn start(&self) -> Result<()> {
        Shared::start(&self.shared).await
    }

    /// Run the stop sequence exactly once; repeated or concurrent calls are
    /// no-ops.
    pub async fn stop(&self) {
        self.shared.shutdown(false).await;
    }

    /// `start`, block until an external termination request arrives, then
    /// `stop`. This is the only intentionally indefinite block in the public
    /// surface.
    pub async fn run(&self) -> Result<()> {
        let started = self.start().await;
        match &started {
            Ok(()) => {
                wait_for_termination().await;
                info!("Termination request received");
            }
            Err(e) => error!("Failure while running the history mirror: {}", e),
        }
        self.stop().await;
        started
    }
}

impl Shared {
    async fn start(this: &Arc<Self>) -> Result<()> {
        let mut guarded = this.guarded.lock().await;
        match guarded.state {
            LifecycleState::New => {}
            LifecycleState::Running | LifecycleState::Stopped => {
                return Err(MirrorError::config("history mirror cannot be started twice"));
            }
        }

        info!("Starting history mirror");
        if this.config.refresh_interval.is_zero() {
            return Err(MirrorError::config("refresh interval must be positive"));
        }
        let registry = RefreshRegistry::build(&this.config.archive_locations)?;

        std::fs::create_dir_all(&this.web_dir)
            .map_err(|e| MirrorError::io_with_path(e, &this.web_dir))?;
        let jobs_dir = this.web_dir.join(MirrorDefaults::JOBS_DIR);
        std::fs::create_dir_all(&jobs_dir).map_err(|e| MirrorError::io_with_path(e, jobs_dir))?;
        info!("Using {} as the local mirror root", this.web_dir.display());

        this.write_dashboard_config()?;

        let fetcher = ArchiveFetcher::new(
            Arc::new(registry),
            &this.web_dir,
            this.config.refresh_interval,
        );
        fetcher.start().await;
        guarded.fetcher = Some(fetcher);

        guarded.frontend.start(&this.web_dir).await?;

        let hook = {
            let shared = this.clone();
            tokio::spawn(async move {
                wait_for_termination().await;
                shared.shutdown(true).await;
            })
        };
        guarded.termination_hook = Some(hook);

        guarded.state = LifecycleState::Running;
        info!("History mirror started");
        Ok(())
    }

    /// Best-effort stop sequence. Each sub-step failure is logged and never
    /// prevents the remaining steps from running.
    ///
    /// Entering the mutual-exclusion section before the one-shot check makes
    /// a losing caller block until the winner's cleanup has completed, so no
    /// caller can observe a half-stopped mirror.
    async fn shutdown(&self, from_hook: bool) {
        let mut guarded = self.guarded.lock().await;

        // tested-and-set before any stop sub-step runs; the loser returns
        if self
            .shutdown_requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        info!("Stopping history mirror");

        if let Err(e) = guarded.frontend.stop().await {
            warn!("Error while stopping the dashboard server: {}", e);
        }

        if let Some(fetcher) = guarded.fetcher.take() {
            fetcher.stop().await;
        }

        info!("Removing local mirror root {}", self.web_dir.display());
        match tokio::fs::remove_dir_all(&self.web_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Error while deleting mirror root {}: {}",
                self.web_dir.display(),
                e
            ),
        }

        // Deregister the termination hook unless it is the currently
        // executing context.
        if let Some(hook) = guarded.termination_hook.take() {
            if !from_hook {
                hook.abort();
            }
        }

        guarded.state = LifecycleState::Stopped;
        info!("Stopped history mirror");
    }

    fn write_dashboard_config(&self) -> Result<()> {
        let payload = DashboardConfig {
            refresh_interval_ms: self.config.web_refresh_interval.as_millis() as u64,
            version: env!("CARGO_PKG_VERSION"),
            ssl_enabled: self.config.ssl_enabled,
        };
        let path = self.web_dir.join(MirrorDefaults::CONFIG_FILE);
        let serialized = serde_json::to_string_pretty(&payload)?;
        std::fs::write(&path, serialized).map_err(|e| MirrorError::io_with_path(e, &path))
    }
}

/// Resolve when an external termination request arrives (Ctrl-C, or SIGTERM
/// on unix). Installation failures are logged and treated as "no signal will
/// ever arrive" rather than panicking inside library code.
async fn wait_for_termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
