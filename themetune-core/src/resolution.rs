use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, warn};

use crate::{
    domain::{EntityId, LibraryEntity},
    mapping_store::MappingStore,
    resolver::{CandidateResolver, Probe, probe_file},
};

/// Single entry point answering "which file is this entity's theme song".
///
/// Combines the candidate probes with the mapping table and keeps the table
/// honest: mappings whose file disappeared are dropped on first sight.
#[derive(Debug, Clone)]
pub struct ThemeResolver {
    store: Arc<MappingStore>,
    candidates: CandidateResolver,
}

impl ThemeResolver {
    pub fn new(store: Arc<MappingStore>) -> Self {
        Self {
            store,
            candidates: CandidateResolver::new(),
        }
    }

    pub fn resolve_theme_asset(&self, entity: &LibraryEntity) -> Option<PathBuf> {
        let settings = self.store.settings();

        if let Some(custom_path) = settings.custom_path() {
            if let Some(hit) = self.candidates.resolve_in_custom_path(entity, custom_path) {
                self.register(entity.id, &hit.path);
                return Some(hit.path);
            }

            if settings.is_exclusive() {
                debug!(series = %entity.name, "No theme song in exclusive custom path");
                return None;
            }
        }

        if let Some(mapped) = self.mapped_asset(entity.id) {
            return Some(mapped);
        }

        self.candidates
            .resolve_in_entity_folder(entity)
            .map(|hit| hit.path)
    }

    /// Existing mapped file for `entity_id`, removing the mapping when its
    /// target is gone. Probe errors leave the mapping in place.
    fn mapped_asset(&self, entity_id: EntityId) -> Option<PathBuf> {
        let mapped = self.store.lookup(entity_id)?;

        match probe_file(&mapped) {
            Probe::Found(path) => Some(path),
            Probe::Missing => {
                info!(%entity_id, path = %mapped.display(), "Removing stale theme mapping");
                if let Err(err) = self.store.remove(entity_id) {
                    warn!(%entity_id, error = %err, "Failed to remove stale theme mapping");
                }
                None
            }
            failed @ Probe::Failed { .. } => failed.found(),
        }
    }

    fn register(&self, entity_id: EntityId, path: &Path) {
        if let Err(err) = self.store.upsert(entity_id, path) {
            warn!(%entity_id, path = %path.display(), error = %err, "Could not register resolved theme song");
        }
    }
}
