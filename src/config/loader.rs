use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, ConfigError};

use super::types::DriverConfig;

/// Loads the configuration from the provided path or the default locations
/// `benchdriver.toml` and `benchdriver.json`.
///
/// # Errors
///
/// Returns an error when no file is found or it cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> AppResult<DriverConfig> {
    if let Some(path) = path {
        return load_config_file(Path::new(path));
    }

    let toml_path = PathBuf::from("benchdriver.toml");
    if toml_path.exists() {
        return load_config_file(&toml_path);
    }

    let json_path = PathBuf::from("benchdriver.json");
    if json_path.exists() {
        return load_config_file(&json_path);
    }

    Err(AppError::config(ConfigError::NotFound))
}

/// Parses a configuration file, picking the format from its extension.
///
/// # Errors
///
/// Returns an error when the file cannot be read, has an unknown extension,
/// or does not parse.
pub fn load_config_file(path: &Path) -> AppResult<DriverConfig> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some("json") => serde_json::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some(ext) => Err(AppError::config(ConfigError::UnsupportedExtension {
            ext: ext.to_owned(),
        })),
        None => Err(AppError::config(ConfigError::MissingExtension)),
    }
}
