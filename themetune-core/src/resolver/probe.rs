use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::warn;

use super::candidates::SUPPORTED_EXTENSIONS;

/// Classified result of a single filesystem probe.
#[derive(Debug)]
pub enum Probe {
    Found(PathBuf),
    Missing,
    Failed { path: PathBuf, error: io::Error },
}

impl Probe {
    /// Collapse into an optional hit. Failures are logged and count as a miss.
    pub fn found(self) -> Option<PathBuf> {
        match self {
            Probe::Found(path) => Some(path),
            Probe::Missing => None,
            Probe::Failed { path, error } => {
                warn!(path = %path.display(), error = %error, "Theme song probe failed");
                None
            }
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Probe::Found(_))
    }
}

/// Check whether `path` is an existing regular file.
pub fn probe_file(path: &Path) -> Probe {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Probe::Found(path.to_path_buf()),
        Ok(_) => Probe::Missing,
        Err(error) if error.kind() == io::ErrorKind::NotFound => Probe::Missing,
        Err(error) => Probe::Failed {
            path: path.to_path_buf(),
            error,
        },
    }
}

/// Find the first audio file in `dir`, honouring extension priority.
///
/// Extensions are compared case-insensitively; among files sharing the
/// winning extension the lexicographically smallest name is returned.
pub fn scan_directory(dir: &Path) -> Probe {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Probe::Missing,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Probe::Missing;
        }
        Err(error) => {
            return Probe::Failed {
                path: dir.to_path_buf(),
                error,
            };
        }
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            return Probe::Failed {
                path: dir.to_path_buf(),
                error,
            };
        }
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(error) => {
                warn!(dir = %dir.display(), error = %error, "Skipping unreadable directory entry");
            }
        }
    }
    files.sort();

    SUPPORTED_EXTENSIONS
        .iter()
        .find_map(|ext| files.iter().find(|file| has_extension(file, ext)))
        .map_or(Probe::Missing, |file| Probe::Found(file.clone()))
}

pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
