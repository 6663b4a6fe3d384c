use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::clockify::Endpoints;

pub const API_KEY_ENV: &str = "CLOCKIFY_API_KEY";
pub const WORKSPACE_ENV: &str = "CLOCKIFY_WORKSPACE_ID";
pub const API_URL_ENV: &str = "CLOCKIFY_API_URL";
pub const REPORTS_URL_ENV: &str = "CLOCKIFY_REPORTS_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing API key: set CLOCKIFY_API_KEY or add \"api_key\" to {path}")]
    MissingApiKey { path: String },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_key: Option<String>,
    workspace_id: Option<String>,
    api_url: Option<String>,
    reports_url: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub workspace_id: Option<String>,
    pub endpoints: Endpoints,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("workspace_id", &self.workspace_id)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

const APP_DIR: &str = "clockify-mcp";
const LEGACY_APP_DIR: &str = "ticktock-mcp";

/// `~/.config/clockify-mcp/config.json`
pub fn default_path() -> Option<PathBuf> {
    config_file(APP_DIR)
}

/// `~/.config/ticktock-mcp/config.json`, read when the default file is absent.
pub fn legacy_path() -> Option<PathBuf> {
    config_file(LEGACY_APP_DIR)
}

fn config_file(app_dir: &str) -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(".config");
    path.push(app_dir);
    path.push("config.json");
    Some(path)
}

/// Environment first, then the config file at `path` (or the default location).
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => first_existing(default_path(), legacy_path()),
    };
    load_with(path.as_deref(), |key| env::var(key).ok())
}

/// The default file when it exists, else the legacy one when that exists,
/// else the default so error messages name it.
fn first_existing(default: Option<PathBuf>, legacy: Option<PathBuf>) -> Option<PathBuf> {
    match (default, legacy) {
        (Some(default), _) if default.exists() => Some(default),
        (_, Some(legacy)) if legacy.exists() => {
            debug!(path = %legacy.display(), "using legacy config location");
            Some(legacy)
        }
        (default, _) => default,
    }
}

fn load_with(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let file = path.map(read_file).unwrap_or_default();

    let api_key = pick(lookup(API_KEY_ENV), file.api_key).ok_or_else(|| {
        ConfigError::MissingApiKey {
            path: path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "the config file".to_string()),
        }
    })?;

    let defaults = Endpoints::default();
    Ok(Config {
        api_key,
        workspace_id: pick(lookup(WORKSPACE_ENV), file.workspace_id),
        endpoints: Endpoints {
            api: pick(lookup(API_URL_ENV), file.api_url).unwrap_or(defaults.api),
            reports: pick(lookup(REPORTS_URL_ENV), file.reports_url).unwrap_or(defaults.reports),
        },
    })
}

fn pick(env_value: Option<String>, file_value: Option<String>) -> Option<String> {
    non_blank(env_value).or_else(|| non_blank(file_value))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// A missing file is normal; an unreadable one is logged and treated as empty.
fn read_file(path: &Path) -> FileConfig {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file");
            return FileConfig::default();
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read config file");
            return FileConfig::default();
        }
    };
    serde_json::from_str(&contents).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "could not parse config file");
        FileConfig::default()
    })
}
