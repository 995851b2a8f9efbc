use std::{fmt, sync::Arc};

use themetune_core::{MappingStore, ThemeAcquisition, ThemeResolver, ports::LibraryCatalog};

use super::download_jobs::DownloadJobs;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MappingStore>,
    pub resolver: Arc<ThemeResolver>,
    pub catalog: Arc<dyn LibraryCatalog>,
    pub downloads: DownloadJobs,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("downloads_running", &self.downloads.is_running())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        store: Arc<MappingStore>,
        catalog: Arc<dyn LibraryCatalog>,
        acquisition: Arc<ThemeAcquisition>,
    ) -> Self {
        Self {
            resolver: Arc::new(ThemeResolver::new(Arc::clone(&store))),
            store,
            catalog,
            downloads: DownloadJobs::new(acquisition),
        }
    }
}
