//! Config file loader and serialization.

use super::PatcherConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// File picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "droidpatch.toml";

/// Load config from a TOML file.
pub fn load_config_from_file(path: &Path) -> Result<PatcherConfig, ConfigError> {
    validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: PatcherConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save config to a TOML file.
pub fn save_config_to_file(config: &PatcherConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| ConfigError::ValidationFailed(format!("Cannot serialize config: {}", e)))?;
    fs::write(path, content).map_err(ConfigError::IoError)?;
    Ok(())
}

/// Pick the config source for this run.
///
/// An explicit path must exist. Without one, `droidpatch.toml` in `cwd` is
/// used when present, otherwise defaults.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<(PatcherConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = explicit {
        let config = load_config_from_file(path)?;
        return Ok((config, Some(path.to_path_buf())));
    }

    let candidate = cwd.join(DEFAULT_CONFIG_FILE);
    if candidate.is_file() {
        let config = load_config_from_file(&candidate)?;
        return Ok((config, Some(candidate)));
    }

    Ok((PatcherConfig::default(), None))
}

/// Validate config path (.toml extension required).
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "toml" => Ok(()),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .toml extension, got .{}",
            ext.to_string_lossy()
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .toml extension".to_string(),
        )),
    }
}
