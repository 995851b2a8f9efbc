//! Filesystem-backed series catalog.
//!
//! Every immediate subdirectory of a library root is one series. Provider ids
//! come from tags in the folder name, e.g. `Lost (2004) [tvdbid-73739]`.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use themetune_core::{
    Result, ThemeError,
    domain::{EntityId, EntityQuery, LibraryEntity, MetadataProvider},
    ports::LibraryCatalog,
    resolver::{SUPPORTED_EXTENSIONS, probe::has_extension},
};

static PROVIDER_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[\[{](tvdbid|tvdb|tmdbid|tmdb|imdbid|imdb)-([a-z0-9]+)[\]}]")
        .expect("provider tag regex should compile")
});

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex should compile"));

/// Subfolder holding extra theme music next to the episodes.
pub const THEME_MUSIC_DIR: &str = "theme-music";

#[derive(Debug, Clone)]
pub struct FsSeriesCatalog {
    roots: Arc<Vec<PathBuf>>,
}

impl FsSeriesCatalog {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots: Arc::new(roots),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    async fn scan(&self) -> Result<Vec<LibraryEntity>> {
        let roots = Arc::clone(&self.roots);
        tokio::task::spawn_blocking(move || scan_roots(&roots))
            .await
            .map_err(|err| ThemeError::Internal(format!("library scan task failed: {err}")))
    }
}

#[async_trait]
impl LibraryCatalog for FsSeriesCatalog {
    async fn list_entities(&self, query: &EntityQuery) -> Result<Vec<LibraryEntity>> {
        let entities = self.scan().await?;
        Ok(entities
            .into_iter()
            .filter(|entity| query.matches(entity))
            .collect())
    }

    async fn entity(&self, id: EntityId) -> Result<Option<LibraryEntity>> {
        let entities = self.scan().await?;
        Ok(entities.into_iter().find(|entity| entity.id == id))
    }
}

fn scan_roots(roots: &[PathBuf]) -> Vec<LibraryEntity> {
    let mut entities = Vec::new();
    for root in roots {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "Library root is not readable");
                continue;
            }
        };

        let mut folders: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
            .map(|entry| entry.path())
            .filter(|path| !is_hidden(path))
            .collect();
        folders.sort();

        entities.extend(folders.iter().filter_map(|folder| series_from_folder(folder)));
    }
    debug!(series = entities.len(), "Library scanned");
    entities
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Stable identity derived from the series folder path.
pub fn entity_id_for(path: &Path) -> EntityId {
    EntityId(Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        path.to_string_lossy().as_bytes(),
    ))
}

fn series_from_folder(folder: &Path) -> Option<LibraryEntity> {
    let folder_name = folder.file_name()?.to_string_lossy();
    let (name, provider_ids) = parse_folder_name(&folder_name);

    let entity = provider_ids.into_iter().fold(
        LibraryEntity::series(entity_id_for(folder), name, folder),
        |entity, (provider, id)| entity.with_provider_id(provider, id),
    );
    Some(entity.with_theme_song_count(count_theme_songs(folder)))
}

/// Split a series folder name into its display name and provider tags.
pub fn parse_folder_name(folder_name: &str) -> (String, Vec<(MetadataProvider, String)>) {
    let provider_ids = PROVIDER_TAG_REGEX
        .captures_iter(folder_name)
        .filter_map(|caps| {
            let provider = match caps[1].to_ascii_lowercase().as_str() {
                "tvdb" | "tvdbid" => MetadataProvider::Tvdb,
                "tmdb" | "tmdbid" => MetadataProvider::Tmdb,
                "imdb" | "imdbid" => MetadataProvider::Imdb,
                _ => return None,
            };
            Some((provider, caps[2].to_string()))
        })
        .collect();

    let stripped = PROVIDER_TAG_REGEX.replace_all(folder_name, " ");
    let name = WHITESPACE_REGEX
        .replace_all(stripped.trim(), " ")
        .into_owned();
    let name = if name.is_empty() {
        folder_name.trim().to_string()
    } else {
        name
    };

    (name, provider_ids)
}

/// `theme.<ext>` files beside the episodes plus audio in `theme-music/`.
fn count_theme_songs(folder: &Path) -> usize {
    let in_folder = audio_files(folder)
        .iter()
        .filter(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.eq_ignore_ascii_case("theme"))
        })
        .count();

    in_folder + audio_files(&folder.join(THEME_MUSIC_DIR)).len()
}

fn audio_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && SUPPORTED_EXTENSIONS.iter().any(|ext| has_extension(path, ext))
        })
        .collect()
}
