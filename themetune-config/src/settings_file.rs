//! TOML-backed persistence of the theme song settings and mapping table.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use themetune_core::{
    Result, ThemeError, domain::ResolutionConfiguration, ports::ConfigurationPersistence,
};

/// Startup override for the custom theme song directory.
pub const CUSTOM_PATH_OVERRIDE_VAR: &str = "THEME_SONGS_CUSTOM_PATH";

/// Value of [`CUSTOM_PATH_OVERRIDE_VAR`], if set.
pub fn custom_path_override() -> Option<String> {
    std::env::var(CUSTOM_PATH_OVERRIDE_VAR).ok()
}

/// Saves replace the file atomically: the record is written to a temp file in
/// the same directory, synced, then renamed over the previous file.
#[derive(Debug, Clone)]
pub struct TomlSettingsFile {
    path: PathBuf,
}

impl TomlSettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

impl ConfigurationPersistence for TomlSettingsFile {
    fn load(&self) -> Result<ResolutionConfiguration> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No theme song settings file yet, using defaults");
                return Ok(ResolutionConfiguration::default());
            }
            Err(err) => return Err(ThemeError::persistence(&self.path, err)),
        };

        toml::from_str(&contents).map_err(|err| ThemeError::persistence(&self.path, err))
    }

    fn save(&self, config: &ResolutionConfiguration) -> Result<()> {
        let rendered =
            toml::to_string(config).map_err(|err| ThemeError::persistence(&self.path, err))?;

        let dir = self.parent_dir();
        fs::create_dir_all(dir).map_err(|err| ThemeError::persistence(dir, err))?;

        let mut tmp =
            NamedTempFile::new_in(dir).map_err(|err| ThemeError::persistence(dir, err))?;
        tmp.write_all(rendered.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|err| ThemeError::persistence(tmp.path(), err))?;
        tmp.persist(&self.path)
            .map_err(|err| ThemeError::persistence(&self.path, err.error))?;

        debug!(path = %self.path.display(), mappings = config.mappings.len(), "Theme song settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_default_record() {
        let dir = TempDir::new().unwrap();
        let file = TomlSettingsFile::new(dir.path().join("theme-songs.toml"));

        assert_eq!(file.load().unwrap(), ResolutionConfiguration::default());
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("theme-songs.toml");
        fs::write(&path, "use_custom_path_exclusively = \"sometimes\"").unwrap();

        let err = TomlSettingsFile::new(&path).load().unwrap_err();
        assert!(matches!(err, ThemeError::Persistence(_)));
        assert!(err.to_string().contains("theme-songs.toml"), "{err}");
    }

    #[test]
    fn save_creates_parent_directory_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("theme-songs.toml");
        let file = TomlSettingsFile::new(&path);

        file.save(&ResolutionConfiguration::default()).unwrap();

        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("theme-songs.toml")]);
    }
}
