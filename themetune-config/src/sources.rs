use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub library: FileLibraryConfig,
    #[serde(default)]
    pub themes: FileThemesConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLibraryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<Vec<PathBuf>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileThemesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_downloads: Option<usize>,
    /// Human readable duration such as `30s` or `1m 30s`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
}

/// Environment-derived configuration values, kept raw so parse failures can
/// name the variable they came from.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub library_roots: Option<String>,
    pub settings_path: Option<PathBuf>,
    pub remote_base_url: Option<String>,
    pub max_concurrent_downloads: Option<String>,
    pub request_timeout: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            config_path: var("THEMETUNE_CONFIG").map(PathBuf::from),
            server_host: var("THEMETUNE_HOST"),
            server_port: var("THEMETUNE_PORT"),
            library_roots: var("THEMETUNE_LIBRARY_ROOTS"),
            settings_path: var("THEMETUNE_SETTINGS_PATH").map(PathBuf::from),
            remote_base_url: var("THEMETUNE_REMOTE_BASE_URL"),
            max_concurrent_downloads: var("THEMETUNE_MAX_CONCURRENT_DOWNLOADS"),
            request_timeout: var("THEMETUNE_REQUEST_TIMEOUT"),
        }
    }
}

pub(crate) fn split_library_roots(raw: &str) -> Vec<PathBuf> {
    std::env::split_paths(raw)
        .filter(|path| !path.as_os_str().is_empty())
        .collect()
}
