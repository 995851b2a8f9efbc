//! Candidate lookup of an existing theme song for an entity.

pub mod candidates;
pub mod probe;

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{error, info};

use crate::domain::LibraryEntity;

pub use candidates::{
    PLACEHOLDER, SUPPORTED_EXTENSIONS, candidate_file_names, sanitize_file_name,
    series_folder_name,
};
pub use probe::{Probe, probe_file, scan_directory};

/// Where a resolved candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// Flat file directly inside the custom path.
    CustomPath,
    /// File inside `{custom path}/{series name}/`.
    CustomSubfolder,
    /// File inside the entity's own folder.
    EntityFolder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub source: CandidateSource,
}

/// Probes candidate locations in priority order, stopping at the first hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateResolver;

impl CandidateResolver {
    pub fn new() -> Self {
        Self
    }

    /// Flat candidate names, then the per-series subfolder.
    pub fn resolve_in_custom_path(
        &self,
        entity: &LibraryEntity,
        custom_path: &Path,
    ) -> Option<Candidate> {
        if !ensure_directory(custom_path) {
            return None;
        }

        for file_name in candidate_file_names(entity) {
            if let Some(path) = probe_file(&custom_path.join(&file_name)).found() {
                info!(series = %entity.name, path = %path.display(), "Found theme song at custom path");
                return Some(Candidate {
                    path,
                    source: CandidateSource::CustomPath,
                });
            }
        }

        let series_folder = custom_path.join(series_folder_name(entity));
        let path = scan_directory(&series_folder).found()?;
        info!(series = %entity.name, path = %path.display(), "Found theme song in series subfolder");
        Some(Candidate {
            path,
            source: CandidateSource::CustomSubfolder,
        })
    }

    pub fn resolve_in_entity_folder(&self, entity: &LibraryEntity) -> Option<Candidate> {
        let path = scan_directory(entity.storage_path()).found()?;
        info!(series = %entity.name, path = %path.display(), "Found theme song in series folder");
        Some(Candidate {
            path,
            source: CandidateSource::EntityFolder,
        })
    }
}

/// Make sure `dir` exists, creating it when missing. Returns `false` (after
/// logging) when the directory cannot be created.
pub fn ensure_directory(dir: &Path) -> bool {
    if dir.is_dir() {
        return true;
    }

    match fs::create_dir_all(dir) {
        Ok(()) => {
            info!(path = %dir.display(), "Created custom theme songs directory");
            true
        }
        Err(err) => {
            error!(path = %dir.display(), error = %err, "Failed to create custom theme songs directory");
            false
        }
    }
}
