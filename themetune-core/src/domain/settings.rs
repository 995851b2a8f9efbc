use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// Durable association between an entity and its resolved theme song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeMapping {
    pub entity_id: EntityId,
    pub asset_path: PathBuf,
}

/// Persisted record handed to and received from the configuration
/// collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResolutionConfiguration {
    #[serde(default)]
    pub custom_theme_songs_path: String,
    #[serde(default)]
    pub use_custom_path_exclusively: bool,
    #[serde(default)]
    pub mappings: Vec<ThemeMapping>,
}

impl ResolutionConfiguration {
    pub fn settings(&self) -> ResolutionSettings {
        ResolutionSettings::from_raw(
            &self.custom_theme_songs_path,
            self.use_custom_path_exclusively,
        )
    }
}

/// Normalized view of the user-editable resolution knobs.
///
/// A blank custom path means "not configured", in which case exclusivity is
/// always reported as off regardless of the stored flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSettings {
    custom_path: Option<PathBuf>,
    use_custom_path_exclusively: bool,
}

impl ResolutionSettings {
    pub fn from_raw(custom_path: &str, use_custom_path_exclusively: bool) -> Self {
        let trimmed = custom_path.trim();
        Self {
            custom_path: (!trimmed.is_empty()).then(|| PathBuf::from(trimmed)),
            use_custom_path_exclusively,
        }
    }

    pub fn custom_path(&self) -> Option<&Path> {
        self.custom_path.as_deref()
    }

    pub fn is_exclusive(&self) -> bool {
        self.custom_path.is_some() && self.use_custom_path_exclusively
    }
}

/// Wire shape of the settings exposed to the configuration UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSongSettings {
    #[serde(default)]
    pub custom_theme_songs_path: String,
    #[serde(default)]
    pub use_custom_path_exclusively: bool,
}

impl From<&ResolutionConfiguration> for ThemeSongSettings {
    fn from(config: &ResolutionConfiguration) -> Self {
        Self {
            custom_theme_songs_path: config.custom_theme_songs_path.clone(),
            use_custom_path_exclusively: config.use_custom_path_exclusively,
        }
    }
}
