//! Configuration for themetune.
//!
//! Two records live here: the server [`Config`] read once at startup from
//! `.env`, an optional TOML file and `THEMETUNE_*` variables, and the
//! [`TomlSettingsFile`] that persists the theme song settings and mapping
//! table between restarts.

#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod settings_file;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader};
pub use models::{Config, ConfigMetadata, LibraryConfig, ServerConfig, ThemesConfig};
pub use settings_file::{CUSTOM_PATH_OVERRIDE_VAR, TomlSettingsFile, custom_path_override};
pub use validation::{ConfigWarning, ConfigWarnings};
