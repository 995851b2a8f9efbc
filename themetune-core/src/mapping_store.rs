use std::{
    any::type_name_of_val,
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    domain::{
        EntityId, ResolutionConfiguration, ResolutionSettings, ThemeMapping,
        ThemeSongSettings,
    },
    error::Result,
    ports::ConfigurationPersistence,
};

/// Live, persisted resolution configuration: the user-facing settings plus
/// the entity → theme song mapping table.
///
/// Every mutation runs under one lock and is saved before the lock is
/// released, so concurrent writers are serialized and a failed save leaves
/// the in-memory state exactly as it was before the call.
pub struct MappingStore {
    persistence: Arc<dyn ConfigurationPersistence>,
    state: Mutex<StoreState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StoreState {
    custom_theme_songs_path: String,
    use_custom_path_exclusively: bool,
    mappings: BTreeMap<EntityId, PathBuf>,
}

impl StoreState {
    fn from_record(record: ResolutionConfiguration) -> Self {
        // Later duplicates win, matching upsert semantics.
        let mappings = record
            .mappings
            .into_iter()
            .map(|mapping| (mapping.entity_id, mapping.asset_path))
            .collect();

        Self {
            custom_theme_songs_path: record.custom_theme_songs_path,
            use_custom_path_exclusively: record.use_custom_path_exclusively,
            mappings,
        }
    }

    fn to_record(&self) -> ResolutionConfiguration {
        ResolutionConfiguration {
            custom_theme_songs_path: self.custom_theme_songs_path.clone(),
            use_custom_path_exclusively: self.use_custom_path_exclusively,
            mappings: self
                .mappings
                .iter()
                .map(|(entity_id, asset_path)| ThemeMapping {
                    entity_id: *entity_id,
                    asset_path: asset_path.clone(),
                })
                .collect(),
        }
    }

    fn settings(&self) -> ResolutionSettings {
        ResolutionSettings::from_raw(
            &self.custom_theme_songs_path,
            self.use_custom_path_exclusively,
        )
    }
}

impl fmt::Debug for MappingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MappingStore")
            .field("persistence", &type_name_of_val(self.persistence.as_ref()))
            .field("custom_theme_songs_path", &state.custom_theme_songs_path)
            .field(
                "use_custom_path_exclusively",
                &state.use_custom_path_exclusively,
            )
            .field("mappings", &state.mappings.len())
            .finish()
    }
}

impl MappingStore {
    /// Load the current record from `persistence`.
    pub fn open(persistence: Arc<dyn ConfigurationPersistence>) -> Result<Self> {
        let record = persistence.load()?;
        let state = StoreState::from_record(record);
        info!(
            custom_path = %display_custom_path(&state.custom_theme_songs_path),
            exclusive = state.use_custom_path_exclusively,
            mappings = state.mappings.len(),
            "Theme song configuration loaded"
        );

        Ok(Self {
            persistence,
            state: Mutex::new(state),
        })
    }

    pub fn settings(&self) -> ResolutionSettings {
        self.state.lock().settings()
    }

    pub fn theme_song_settings(&self) -> ThemeSongSettings {
        let state = self.state.lock();
        ThemeSongSettings {
            custom_theme_songs_path: state.custom_theme_songs_path.clone(),
            use_custom_path_exclusively: state.use_custom_path_exclusively,
        }
    }

    /// Replace the user-editable settings. Either both values are persisted
    /// or neither is applied.
    pub fn update_settings(&self, update: ThemeSongSettings) -> Result<()> {
        self.mutate(|state| {
            state.custom_theme_songs_path = update.custom_theme_songs_path;
            state.use_custom_path_exclusively = update.use_custom_path_exclusively;
        })?;

        info!(
            custom_path = %display_custom_path(&self.theme_song_settings().custom_theme_songs_path),
            "Theme song settings updated"
        );
        Ok(())
    }

    /// Apply a startup override of the custom path. Blank or missing values
    /// are ignored; returns whether the stored value changed.
    pub fn apply_custom_path_override(&self, value: Option<&str>) -> Result<bool> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(false);
        };

        if self.state.lock().custom_theme_songs_path == value {
            return Ok(false);
        }

        self.mutate(|state| {
            state.custom_theme_songs_path = value.to_string();
        })?;
        info!(custom_path = %value, "Custom theme song path overridden from environment");
        Ok(true)
    }

    pub fn lookup(&self, entity_id: EntityId) -> Option<PathBuf> {
        self.state.lock().mappings.get(&entity_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register `asset_path` for `entity_id`, replacing any previous path.
    pub fn upsert(&self, entity_id: EntityId, asset_path: &Path) -> Result<()> {
        let mut state = self.state.lock();
        if state.mappings.get(&entity_id).map(PathBuf::as_path) == Some(asset_path) {
            debug!(%entity_id, path = %asset_path.display(), "Theme mapping unchanged");
            return Ok(());
        }

        let previous = state.mappings.insert(entity_id, asset_path.to_path_buf());
        if let Err(err) = self.persistence.save(&state.to_record()) {
            match previous {
                Some(path) => state.mappings.insert(entity_id, path),
                None => state.mappings.remove(&entity_id),
            };
            warn!(%entity_id, error = %err, "Failed to persist theme mapping");
            return Err(err);
        }

        debug!(%entity_id, path = %asset_path.display(), "Theme mapping registered");
        Ok(())
    }

    /// Drop the mapping for `entity_id`; returns whether one existed.
    pub fn remove(&self, entity_id: EntityId) -> Result<bool> {
        let mut state = self.state.lock();
        let Some(previous) = state.mappings.remove(&entity_id) else {
            return Ok(false);
        };

        if let Err(err) = self.persistence.save(&state.to_record()) {
            state.mappings.insert(entity_id, previous);
            warn!(%entity_id, error = %err, "Failed to persist theme mapping removal");
            return Err(err);
        }

        debug!(%entity_id, path = %previous.display(), "Theme mapping removed");
        Ok(true)
    }

    fn mutate(&self, apply: impl FnOnce(&mut StoreState)) -> Result<()> {
        let mut state = self.state.lock();
        let previous = state.clone();
        apply(&mut state);

        if *state == previous {
            return Ok(());
        }

        if let Err(err) = self.persistence.save(&state.to_record()) {
            *state = previous;
            return Err(err);
        }
        Ok(())
    }
}

fn display_custom_path(path: &str) -> &str {
    if path.trim().is_empty() { "(not set)" } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MemoryConfigurationPersistence;

    fn store_with(
        record: ResolutionConfiguration,
    ) -> (MappingStore, Arc<MemoryConfigurationPersistence>) {
        let persistence = Arc::new(MemoryConfigurationPersistence::new(record));
        let store = MappingStore::open(persistence.clone()).unwrap();
        (store, persistence)
    }

    #[test]
    fn upsert_twice_keeps_single_entry_with_latest_path() {
        let (store, persistence) = store_with(ResolutionConfiguration::default());
        let id = EntityId::new();

        store.upsert(id, Path::new("/themes/a.mp3")).unwrap();
        store.upsert(id, Path::new("/themes/b.mp3")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup(id), Some(PathBuf::from("/themes/b.mp3")));

        let saved = persistence.saved();
        assert_eq!(saved.mappings.len(), 1);
        assert_eq!(saved.mappings[0].asset_path, PathBuf::from("/themes/b.mp3"));
    }

    #[test]
    fn upsert_with_same_path_does_not_persist_again() {
        let (store, persistence) = store_with(ResolutionConfiguration::default());
        let id = EntityId::new();

        store.upsert(id, Path::new("/themes/a.mp3")).unwrap();
        store.upsert(id, Path::new("/themes/a.mp3")).unwrap();

        assert_eq!(persistence.save_count(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let id = EntityId::new();
        let (store, persistence) = store_with(ResolutionConfiguration {
            mappings: vec![ThemeMapping {
                entity_id: id,
                asset_path: "/themes/a.mp3".into(),
            }],
            ..Default::default()
        });

        assert!(store.remove(id).unwrap());
        assert!(!store.remove(id).unwrap());
        assert_eq!(persistence.save_count(), 1);
        assert!(persistence.saved().mappings.is_empty());
    }

    #[test]
    fn duplicate_ids_in_loaded_record_collapse_to_last_entry() {
        let id = EntityId::new();
        let (store, _) = store_with(ResolutionConfiguration {
            mappings: vec![
                ThemeMapping {
                    entity_id: id,
                    asset_path: "/old.mp3".into(),
                },
                ThemeMapping {
                    entity_id: id,
                    asset_path: "/new.mp3".into(),
                },
            ],
            ..Default::default()
        });

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup(id), Some(PathBuf::from("/new.mp3")));
    }

    #[test]
    fn failed_save_rolls_back_mapping_and_settings() {
        let id = EntityId::new();
        let (store, persistence) = store_with(ResolutionConfiguration {
            custom_theme_songs_path: "/srv/themes".into(),
            ..Default::default()
        });
        persistence.set_fail_saves(true);

        assert!(store.upsert(id, Path::new("/themes/a.mp3")).is_err());
        assert_eq!(store.lookup(id), None);

        let err = store
            .update_settings(ThemeSongSettings {
                custom_theme_songs_path: "/elsewhere".into(),
                use_custom_path_exclusively: true,
            })
            .unwrap_err();
        assert!(err.to_string().contains("read-only"));

        let settings = store.theme_song_settings();
        assert_eq!(settings.custom_theme_songs_path, "/srv/themes");
        assert!(!settings.use_custom_path_exclusively);
    }

    #[test]
    fn custom_path_override_persists_non_blank_values_only() {
        let (store, persistence) = store_with(ResolutionConfiguration {
            custom_theme_songs_path: "/stored".into(),
            ..Default::default()
        });

        assert!(!store.apply_custom_path_override(None).unwrap());
        assert!(!store.apply_custom_path_override(Some("  ")).unwrap());
        assert_eq!(persistence.save_count(), 0);

        assert!(store.apply_custom_path_override(Some("/from/env")).unwrap());
        assert_eq!(persistence.saved().custom_theme_songs_path, "/from/env");
        assert_eq!(store.settings().custom_path(), Some(Path::new("/from/env")));
    }

    #[test]
    fn concurrent_upserts_lose_no_updates() {
        let (store, persistence) = store_with(ResolutionConfiguration::default());
        let store = Arc::new(store);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let path = PathBuf::from(format!("/themes/{i}.mp3"));
                    store.upsert(EntityId::new(), &path).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 16);
        assert_eq!(persistence.saved().mappings.len(), 16);
    }
}
