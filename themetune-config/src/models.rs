use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub themes: ThemesConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        self.themes.ensure_directories()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Folders whose immediate subdirectories are TV series.
#[derive(Debug, Clone, Default)]
pub struct LibraryConfig {
    pub roots: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ThemesConfig {
    /// TOML file holding the theme song settings and mapping table.
    pub settings_path: PathBuf,
    pub remote_base_url: String,
    pub max_concurrent_downloads: usize,
    pub request_timeout: Duration,
}

impl ThemesConfig {
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = self
            .settings_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
