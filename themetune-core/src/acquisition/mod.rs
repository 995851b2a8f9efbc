//! Bulk download of missing theme songs from the remote source.
//!
//! Every eligible entity is attempted once per run. Attempts are gated by a
//! semaphore so at most `max_concurrent_downloads` fetches are in flight; a
//! permit is taken in catalog order before the attempt is spawned and is
//! released when the attempt finishes, whatever its outcome.

pub mod source;
pub mod writer;

use std::{
    fmt,
    panic::AssertUnwindSafe,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::FutureExt;
use reqwest::StatusCode;
use tokio::{
    sync::Semaphore,
    task::{self, JoinSet},
};
use tracing::{error, info, warn};

use crate::{
    domain::{EntityQuery, LibraryEntity, MetadataProvider},
    error::{Result, ThemeError},
    mapping_store::MappingStore,
    ports::LibraryCatalog,
    resolver::ensure_directory,
};

pub use source::{
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_THEME_BASE_URL, FetchOutcome, RemoteThemeSource,
    ThemeBody, ThemeSource,
};
pub use writer::write_atomically;

pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 3;

/// File name used when downloading into the entity's own folder.
pub const IN_PLACE_FILE_NAME: &str = "theme.mp3";

/// Terminal state of one entity's attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// Written to `path` and registered in the mapping table.
    Downloaded { path: PathBuf },
    /// The remote source has no theme song for this entity.
    NotAvailable,
    HttpStatus(StatusCode),
    Transport(String),
    /// Local write, registration, or any uncategorized failure.
    Failed(String),
}

/// Per-outcome counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionReport {
    pub attempted: usize,
    pub downloaded: usize,
    pub not_available: usize,
    pub http_errors: usize,
    pub transport_errors: usize,
    pub failed: usize,
}

impl AcquisitionReport {
    fn record(&mut self, outcome: &AcquisitionOutcome) {
        self.attempted += 1;
        match outcome {
            AcquisitionOutcome::Downloaded { .. } => self.downloaded += 1,
            AcquisitionOutcome::NotAvailable => self.not_available += 1,
            AcquisitionOutcome::HttpStatus(_) => self.http_errors += 1,
            AcquisitionOutcome::Transport(_) => self.transport_errors += 1,
            AcquisitionOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for AcquisitionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted={} downloaded={} not_available={} http_errors={} transport_errors={} failed={}",
            self.attempted,
            self.downloaded,
            self.not_available,
            self.http_errors,
            self.transport_errors,
            self.failed
        )
    }
}

#[derive(Clone)]
pub struct ThemeAcquisition {
    catalog: Arc<dyn LibraryCatalog>,
    store: Arc<MappingStore>,
    source: Arc<dyn ThemeSource>,
    permits: Arc<Semaphore>,
    max_concurrent_downloads: usize,
}

impl fmt::Debug for ThemeAcquisition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeAcquisition")
            .field("store", &self.store)
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .field("permits_available", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl ThemeAcquisition {
    pub fn new(
        catalog: Arc<dyn LibraryCatalog>,
        store: Arc<MappingStore>,
        source: Arc<dyn ThemeSource>,
    ) -> Self {
        Self::new_with_concurrency(catalog, store, source, DEFAULT_MAX_CONCURRENT_DOWNLOADS)
    }

    pub fn new_with_concurrency(
        catalog: Arc<dyn LibraryCatalog>,
        store: Arc<MappingStore>,
        source: Arc<dyn ThemeSource>,
        max_concurrent_downloads: usize,
    ) -> Self {
        let max_concurrent_downloads = max_concurrent_downloads.max(1);
        Self {
            catalog,
            store,
            source,
            permits: Arc::new(Semaphore::new(max_concurrent_downloads)),
            max_concurrent_downloads,
        }
    }

    /// Attempt every series that has a TVDB id and no theme song yet.
    ///
    /// Only a failure to enumerate the catalog is returned as an error;
    /// per-entity failures are logged and counted in the report.
    pub async fn acquire_all(&self) -> Result<AcquisitionReport> {
        let entities = self
            .catalog
            .list_entities(&EntityQuery::series_with_tvdb())
            .await?;

        let eligible: Vec<(LibraryEntity, String)> = entities
            .into_iter()
            .filter(|entity| entity.theme_song_count() == 0)
            .filter_map(|entity| {
                let tvdb_id = entity.provider_id(MetadataProvider::Tvdb)?.to_string();
                Some((entity, tvdb_id))
            })
            .collect();

        let worker = AcquisitionWorker {
            store: Arc::clone(&self.store),
            source: Arc::clone(&self.source),
            custom_root: self.custom_root().await,
        };

        info!(
            eligible = eligible.len(),
            concurrency = self.max_concurrent_downloads,
            custom_root = ?worker.custom_root,
            "Downloading TV theme songs"
        );

        let mut report = AcquisitionReport::default();
        let mut tasks = JoinSet::new();

        for (entity, tvdb_id) in eligible {
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => {
                    error!(entity_id = %entity.id, error = %err, "Download gate closed");
                    report.record(&AcquisitionOutcome::Failed(err.to_string()));
                    continue;
                }
            };

            let worker = worker.clone();
            tasks.spawn(async move {
                let _permit = permit;
                AssertUnwindSafe(worker.acquire_one(&entity, &tvdb_id))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        let message = panic_message(panic.as_ref());
                        error!(
                            entity_id = %entity.id,
                            series = %entity.name,
                            error = %message,
                            "Unexpected failure while downloading theme song"
                        );
                        AcquisitionOutcome::Failed(message)
                    })
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(&outcome),
                Err(err) => {
                    error!(error = %err, "Theme song download task did not complete");
                    report.record(&AcquisitionOutcome::Failed(err.to_string()));
                }
            }
        }

        info!(%report, "Completed TV theme song downloads");
        Ok(report)
    }

    /// Custom path to download into, if configured and usable.
    async fn custom_root(&self) -> Option<PathBuf> {
        let custom = self.store.settings().custom_path()?.to_path_buf();
        match task::spawn_blocking(move || ensure_directory(&custom).then_some(custom)).await {
            Ok(root) => root,
            Err(err) => {
                error!(error = %err, "Custom theme songs directory check did not complete");
                None
            }
        }
    }
}

#[derive(Clone)]
struct AcquisitionWorker {
    store: Arc<MappingStore>,
    source: Arc<dyn ThemeSource>,
    custom_root: Option<PathBuf>,
}

impl AcquisitionWorker {
    async fn acquire_one(&self, entity: &LibraryEntity, tvdb_id: &str) -> AcquisitionOutcome {
        let target = target_path(self.custom_root.as_deref(), entity, tvdb_id);
        let url = self.source.source_url(tvdb_id);
        info!(series = %entity.name, %url, "Trying to download theme song");

        match self.source.fetch(tvdb_id).await {
            FetchOutcome::Found(body) => self.store_download(entity, &target, body).await,
            FetchOutcome::NotFound => {
                info!(series = %entity.name, %url, "No theme song available");
                AcquisitionOutcome::NotAvailable
            }
            FetchOutcome::HttpStatus(status) => {
                warn!(series = %entity.name, %url, status = status.as_u16(), "Theme song request failed");
                AcquisitionOutcome::HttpStatus(status)
            }
            FetchOutcome::Transport(message) => {
                warn!(series = %entity.name, %url, error = %message, "Could not reach theme song source");
                AcquisitionOutcome::Transport(message)
            }
        }
    }

    async fn store_download(
        &self,
        entity: &LibraryEntity,
        target: &Path,
        body: ThemeBody,
    ) -> AcquisitionOutcome {
        match write_atomically(target, body).await {
            Ok(bytes) => {
                if let Err(err) = self.register(entity, target).await {
                    error!(entity_id = %entity.id, path = %target.display(), error = %err, "Downloaded theme song could not be registered");
                    return AcquisitionOutcome::Failed(err.to_string());
                }
                info!(series = %entity.name, path = %target.display(), bytes, "Theme song successfully downloaded");
                AcquisitionOutcome::Downloaded {
                    path: target.to_path_buf(),
                }
            }
            Err(ThemeError::Http(err)) => {
                warn!(series = %entity.name, error = %err, "Theme song transfer interrupted");
                AcquisitionOutcome::Transport(err.to_string())
            }
            Err(err) => {
                error!(series = %entity.name, path = %target.display(), error = %err, "Failed to write theme song");
                AcquisitionOutcome::Failed(err.to_string())
            }
        }
    }

    /// Persist the mapping off the async workers; the save fsyncs.
    async fn register(&self, entity: &LibraryEntity, target: &Path) -> Result<()> {
        let store = Arc::clone(&self.store);
        let (entity_id, target) = (entity.id, target.to_path_buf());
        task::spawn_blocking(move || store.upsert(entity_id, &target))
            .await
            .map_err(|err| ThemeError::Internal(err.to_string()))?
    }
}

/// `{custom}/{tvdb}.mp3` when a custom root is usable, otherwise
/// `{entity folder}/theme.mp3`.
pub fn target_path(custom_root: Option<&Path>, entity: &LibraryEntity, tvdb_id: &str) -> PathBuf {
    match custom_root {
        Some(root) => root.join(format!("{tvdb_id}.mp3")),
        None => entity.storage_path().join(IN_PLACE_FILE_NAME),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic during theme song download".to_string()
    }
}
