use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use themetune_core::acquisition::{
    DEFAULT_MAX_CONCURRENT_DOWNLOADS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_THEME_BASE_URL,
};

use crate::{
    models::{Config, ConfigMetadata, LibraryConfig, ServerConfig, ThemesConfig},
    sources::{EnvConfig, FileConfig, split_library_roots},
    validation::ConfigWarnings,
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("themetune.toml"),
        PathBuf::from("config/themetune.toml"),
    ]
});

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8097;
pub const DEFAULT_SETTINGS_PATH: &str = "data/theme-songs.toml";

#[derive(Debug, Default, Clone)]
struct ConfigLoaderOptions {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, then compose the configuration from the process
    /// environment and the configuration file.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose the configuration from an already gathered environment.
    pub fn load_with_env(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) = compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let resolved = match (&self.options.config_path, &env.config_path) {
            (Some(explicit), _) => Some((explicit.clone(), true)),
            (None, Some(from_env)) => Some((from_env.clone(), true)),
            (None, None) => DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .map(|path| (path.clone(), false)),
        };

        let Some((path, required)) = resolved else {
            return Ok((None, None));
        };

        if !path.exists() {
            if required {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        debug!(path = %path.display(), "Reading configuration file");
        let contents = fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
            path: path.clone(),
            source: err,
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if config_path.is_none() {
        warnings.push_with_hint(
            "No themetune.toml detected; using environment variables and defaults",
            "Pass --config or set THEMETUNE_CONFIG to use a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        library: file_library,
        themes: file_themes,
    } = file_config.unwrap_or_default();
    let file_key = |key: &str| match &config_path {
        Some(path) => format!("{key} in {}", path.display()),
        None => key.to_string(),
    };

    let port = match env.server_port {
        Some(raw) => parse_value("THEMETUNE_PORT", &raw, |v| v.trim().parse::<u16>())?,
        None => file_server.port.unwrap_or(DEFAULT_PORT),
    };
    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port,
    };

    let roots = match env.library_roots {
        Some(raw) => split_library_roots(&raw),
        None => file_library.roots.unwrap_or_default(),
    };
    if roots.is_empty() {
        warnings.push_with_hint(
            "No library roots configured; the catalog will be empty",
            "Set THEMETUNE_LIBRARY_ROOTS or [library].roots",
        );
    }
    for root in roots.iter().filter(|root| !root.is_dir()) {
        warnings.push(format!("Library root {} is not a directory", root.display()));
    }
    let library = LibraryConfig { roots };

    let (remote_key, remote_base_url) = match env.remote_base_url {
        Some(url) => ("THEMETUNE_REMOTE_BASE_URL".to_string(), url),
        None => (
            file_key("themes.remote_base_url"),
            file_themes
                .remote_base_url
                .unwrap_or_else(|| DEFAULT_THEME_BASE_URL.to_string()),
        ),
    };
    parse_value(&remote_key, &remote_base_url, |v| Url::parse(v.trim()))?;

    let max_concurrent_downloads = match env.max_concurrent_downloads {
        Some(raw) => parse_value("THEMETUNE_MAX_CONCURRENT_DOWNLOADS", &raw, |v| {
            v.trim().parse::<usize>()
        })?,
        None => file_themes
            .max_concurrent_downloads
            .unwrap_or(DEFAULT_MAX_CONCURRENT_DOWNLOADS),
    };
    let max_concurrent_downloads = if max_concurrent_downloads == 0 {
        warnings.push("max_concurrent_downloads of 0 raised to 1");
        1
    } else {
        max_concurrent_downloads
    };

    let request_timeout = match (env.request_timeout, file_themes.request_timeout) {
        (Some(raw), _) => parse_duration("THEMETUNE_REQUEST_TIMEOUT", &raw)?,
        (None, Some(raw)) => parse_duration(&file_key("themes.request_timeout"), &raw)?,
        (None, None) => DEFAULT_REQUEST_TIMEOUT,
    };

    let themes = ThemesConfig {
        settings_path: env
            .settings_path
            .or(file_themes.settings_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH)),
        remote_base_url: remote_base_url.trim().to_string(),
        max_concurrent_downloads,
        request_timeout,
    };

    let config = Config {
        server,
        library,
        themes,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded: false,
        },
    };

    Ok((config, warnings))
}

fn parse_value<T, E: std::fmt::Display>(
    key: &str,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ConfigLoadError> {
    parse(raw).map_err(|err| ConfigLoadError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration, ConfigLoadError> {
    let duration = parse_value(key, raw, |v| humantime::parse_duration(v.trim()))?;
    if duration.is_zero() {
        return Err(ConfigLoadError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: "duration must be greater than zero".to_string(),
        });
    }
    Ok(duration)
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

impl ConfigLoadError {
    /// Path of the configuration file involved, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::MissingConfig { path } | Self::Io { path, .. } | Self::Parse { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
