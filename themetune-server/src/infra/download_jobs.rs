use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::task::JoinHandle;
use tracing::{error, info};

use themetune_core::ThemeAcquisition;

/// Runs acquisition passes in the background, one at a time.
#[derive(Debug, Clone)]
pub struct DownloadJobs {
    acquisition: Arc<ThemeAcquisition>,
    running: Arc<AtomicBool>,
}

impl DownloadJobs {
    pub fn new(acquisition: Arc<ThemeAcquisition>) -> Self {
        Self {
            acquisition,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start a pass unless one is already running. Returns the handle of the
    /// spawned pass, or `None` when a pass was already in progress.
    pub fn try_start(&self) -> Option<JoinHandle<()>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        let acquisition = Arc::clone(&self.acquisition);
        let running = RunningGuard(Arc::clone(&self.running));
        Some(tokio::spawn(async move {
            let _running = running;
            match acquisition.acquire_all().await {
                Ok(report) => info!(%report, "Theme song download pass finished"),
                Err(err) => error!(error = %err, "Theme song download pass failed"),
            }
        }))
    }
}

/// Clears the running flag when the pass ends, including on panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
