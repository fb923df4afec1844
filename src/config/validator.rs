//! Config validation.

use super::PatcherConfig;
use crate::error::ConfigError;
use std::collections::HashSet;

/// Signing variable names must be present and pairwise distinct.
pub fn validate_signing_env(names: &[String; 4]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Signing environment variable names cannot be empty".to_string(),
            ));
        }
        if name.contains(char::is_whitespace) || name.contains('"') {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid signing environment variable name: {:?}",
                name
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Signing environment variable {} is listed twice",
                name
            )));
        }
    }
    Ok(())
}

/// Icon directory names are single path components.
pub fn validate_icon_dirs(dirs: &[String]) -> Result<(), ConfigError> {
    for dir in dirs {
        if dir.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Icon directory names cannot be empty".to_string(),
            ));
        }
        if dir.contains('/') || dir.contains('\\') || dir == ".." {
            return Err(ConfigError::ValidationFailed(format!(
                "Icon directory must be a plain directory name, got: {}",
                dir
            )));
        }
    }
    Ok(())
}

pub fn validate_permissions(permissions: &[String]) -> Result<(), ConfigError> {
    for permission in permissions {
        if permission.trim().is_empty() || permission.contains('"') || permission.contains('<') {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid permission identifier: {:?}",
                permission
            )));
        }
    }
    Ok(())
}

pub fn validate_config(config: &PatcherConfig) -> Result<(), ConfigError> {
    validate_signing_env(&config.signing_env.names())?;
    validate_icon_dirs(&config.icon_dirs)?;
    validate_permissions(&config.permissions)?;

    if config.signing_script.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Signing script name cannot be empty".to_string(),
        ));
    }
    if let Some(name) = &config.activity_class {
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(ConfigError::ValidationFailed(format!(
                "Activity class must be a simple identifier, got: {}",
                name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningEnv;

    #[test]
    fn test_rejects_empty_env_name() {
        let mut config = PatcherConfig::default();
        config.signing_env.key_alias = " ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_duplicate_env_names() {
        let env = SigningEnv {
            key_password: "ANDROID_KEYSTORE_PASSWORD".to_string(),
            ..Default::default()
        };
        let err = validate_signing_env(&env.names()).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn test_rejects_bad_icon_dirs() {
        assert!(validate_icon_dirs(&["".to_string()]).is_err());
        assert!(validate_icon_dirs(&["../res".to_string()]).is_err());
        assert!(validate_icon_dirs(&["mipmap-hdpi".to_string()]).is_ok());
    }

    #[test]
    fn test_rejects_bad_activity_class() {
        let config = PatcherConfig {
            activity_class: Some("com.example.Main".to_string()),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
