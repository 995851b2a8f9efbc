use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity of a catalog entity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Series,
    Movie,
}

/// External metadata catalogs an entity can carry an identifier for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetadataProvider {
    Tvdb,
    Tmdb,
    Imdb,
}

impl fmt::Display for MetadataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Tvdb => "tvdb",
            Self::Tmdb => "tmdb",
            Self::Imdb => "imdb",
        };
        f.write_str(label)
    }
}

/// Read-only view of a catalog item as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub provider_ids: BTreeMap<MetadataProvider, String>,
    /// Theme songs the host already associates with this entity.
    #[serde(default)]
    pub theme_song_count: usize,
}

impl LibraryEntity {
    pub fn series(
        id: EntityId,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            kind: EntityKind::Series,
            name: name.into(),
            path: path.into(),
            is_virtual: false,
            provider_ids: BTreeMap::new(),
            theme_song_count: 0,
        }
    }

    pub fn with_provider_id(
        mut self,
        provider: MetadataProvider,
        value: impl Into<String>,
    ) -> Self {
        self.provider_ids.insert(provider, value.into());
        self
    }

    pub fn with_theme_song_count(mut self, count: usize) -> Self {
        self.theme_song_count = count;
        self
    }

    /// Provider identifier, ignoring blank values.
    pub fn provider_id(&self, provider: MetadataProvider) -> Option<&str> {
        self.provider_ids
            .get(&provider)
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
    }

    pub fn theme_song_count(&self) -> usize {
        self.theme_song_count
    }

    pub fn storage_path(&self) -> &Path {
        &self.path
    }
}

/// Catalog filter used when enumerating entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityQuery {
    pub include_kinds: Vec<EntityKind>,
    /// `Some(false)` restricts to entities backed by real folders.
    pub is_virtual: Option<bool>,
    pub recursive: bool,
    pub required_provider: Option<MetadataProvider>,
}

impl EntityQuery {
    /// Non-virtual series carrying a TVDB id, enumerated recursively.
    pub fn series_with_tvdb() -> Self {
        Self {
            include_kinds: vec![EntityKind::Series],
            is_virtual: Some(false),
            recursive: true,
            required_provider: Some(MetadataProvider::Tvdb),
        }
    }

    pub fn matches(&self, entity: &LibraryEntity) -> bool {
        if !self.include_kinds.is_empty()
            && !self.include_kinds.contains(&entity.kind)
        {
            return false;
        }

        if let Some(is_virtual) = self.is_virtual
            && entity.is_virtual != is_virtual
        {
            return false;
        }

        match self.required_provider {
            Some(provider) => entity.provider_id(provider).is_some(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_provider_ids_are_treated_as_missing() {
        let entity = LibraryEntity::series(EntityId::new(), "Lost", "/tv/Lost")
            .with_provider_id(MetadataProvider::Tvdb, "  ");
        assert_eq!(entity.provider_id(MetadataProvider::Tvdb), None);
        assert!(!EntityQuery::series_with_tvdb().matches(&entity));
    }

    #[test]
    fn series_query_rejects_virtual_and_non_series_items() {
        let query = EntityQuery::series_with_tvdb();
        let base = LibraryEntity::series(EntityId::new(), "Lost", "/tv/Lost")
            .with_provider_id(MetadataProvider::Tvdb, "73739");
        assert!(query.matches(&base));

        let mut virtual_item = base.clone();
        virtual_item.is_virtual = true;
        assert!(!query.matches(&virtual_item));

        let mut movie = base;
        movie.kind = EntityKind::Movie;
        assert!(!query.matches(&movie));
    }

    #[test]
    fn entity_id_displays_hyphenated_lowercase() {
        let id: EntityId = "6F9619FF-8B86-D011-B42D-00C04FC964FF".parse().unwrap();
        assert_eq!(id.to_string(), "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    }
}
