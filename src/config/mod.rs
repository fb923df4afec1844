//! Configuration for a patch run.
//!
//! # Module Structure
//!
//! - `loader`: reads and writes `droidpatch.toml`, resolves which file applies
//! - `validator`: rejects configurations the patchers cannot act on
//!
//! # Precedence
//!
//! 1. Explicit `--config FILE`
//! 2. `./droidpatch.toml` when present
//! 3. Built-in defaults
//!
//! CLI flags are applied on top of whichever of these was loaded.

pub mod loader;
pub mod validator;

use crate::patcher::locator::LocatorKind;
use crate::patcher::markers::Capability;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the generated Android project, relative to the app
pub const DEFAULT_PROJECT_ROOT: &str = "src-tauri/gen/android";

/// Resource directories refreshed from the icon source
pub const DEFAULT_ICON_DIRS: [&str; 6] = [
    "mipmap-mdpi",
    "mipmap-hdpi",
    "mipmap-xhdpi",
    "mipmap-xxhdpi",
    "mipmap-xxxhdpi",
    "mipmap-anydpi-v26",
];

pub const RECORD_AUDIO_PERMISSION: &str = "android.permission.RECORD_AUDIO";

/// Intent action the speech bridge must be able to see
pub const RECOGNITION_SERVICE_ACTION: &str = "android.speech.RecognitionService";

/// Environment variable names feeding the release signing gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningEnv {
    pub keystore_path: String,
    pub keystore_password: String,
    pub key_alias: String,
    pub key_password: String,
}

impl Default for SigningEnv {
    fn default() -> Self {
        SigningEnv {
            keystore_path: "ANDROID_KEYSTORE_PATH".to_string(),
            keystore_password: "ANDROID_KEYSTORE_PASSWORD".to_string(),
            key_alias: "ANDROID_KEY_ALIAS".to_string(),
            key_password: "ANDROID_KEY_PASSWORD".to_string(),
        }
    }
}

impl SigningEnv {
    /// Names in gate order: path, store password, alias, key password
    pub fn names(&self) -> [String; 4] {
        [
            self.keystore_path.clone(),
            self.keystore_password.clone(),
            self.key_alias.clone(),
            self.key_password.clone(),
        ]
    }
}

/// Per-capability enable flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityToggles {
    pub folder_picker: bool,
    pub mic_permission: bool,
    pub speech_recognition: bool,
    pub release_signing: bool,
    pub settings_fallback: bool,
    pub icon_sync: bool,
}

impl Default for CapabilityToggles {
    fn default() -> Self {
        CapabilityToggles {
            folder_picker: true,
            mic_permission: true,
            speech_recognition: true,
            release_signing: true,
            settings_fallback: true,
            icon_sync: true,
        }
    }
}

impl CapabilityToggles {
    pub fn is_enabled(&self, capability: Capability) -> bool {
        match capability {
            Capability::FolderPicker => self.folder_picker,
            Capability::MicPermission => self.mic_permission,
            Capability::SpeechRecognition => self.speech_recognition,
            Capability::ReleaseSigning => self.release_signing,
            Capability::SettingsFallback => self.settings_fallback,
            // Retired capabilities are always cleaned up
            Capability::ImmersiveMode => true,
        }
    }

    /// Enabled activity bridges, in injection order
    pub fn bridges(&self) -> Vec<Capability> {
        Capability::BRIDGES
            .iter()
            .copied()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}

/// Everything a patch run needs to know.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatcherConfig {
    pub project_root: PathBuf,                // Generated Android tree
    pub activity_class: Option<String>,       // None = first *Activity() subclass
    pub icon_source: Option<PathBuf>,         // None = <project>/../../icons/android
    pub icon_dirs: Vec<String>,
    pub permissions: Vec<String>,
    pub signing_env: SigningEnv,
    pub signing_script: String,               // Relative to the app module
    pub locator: LocatorKind,
    pub generator_command: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub capabilities: CapabilityToggles,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        PatcherConfig {
            project_root: PathBuf::from(DEFAULT_PROJECT_ROOT),
            activity_class: None,
            icon_source: None,
            icon_dirs: DEFAULT_ICON_DIRS.iter().map(|d| d.to_string()).collect(),
            permissions: vec![RECORD_AUDIO_PERMISSION.to_string()],
            signing_env: SigningEnv::default(),
            signing_script: crate::patcher::templates::SIGNING_SCRIPT_NAME.to_string(),
            locator: LocatorKind::default(),
            generator_command: None,
            log_dir: None,
            dry_run: false,
            capabilities: CapabilityToggles::default(),
        }
    }
}

impl PatcherConfig {
    /// Icon source, defaulting to `<project>/../../icons/android`
    pub fn resolved_icon_source(&self) -> PathBuf {
        match &self.icon_source {
            Some(path) => path.clone(),
            None => default_icon_source(&self.project_root),
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        validator::validate_config(self)
    }
}

pub fn default_icon_source(project_root: &Path) -> PathBuf {
    project_root.join("..").join("..").join("icons").join("android")
}

/// CLI-level overrides applied on top of a loaded config.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub project_root: Option<PathBuf>,
    pub icon_source: Option<PathBuf>,
    pub generator_command: Option<String>,
    pub locator: Option<LocatorKind>,
    pub log_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl ConfigOverrides {
    pub fn apply(self, mut config: PatcherConfig) -> PatcherConfig {
        if let Some(root) = self.project_root {
            config.project_root = root;
        }
        if let Some(icons) = self.icon_source {
            config.icon_source = Some(icons);
        }
        if let Some(cmd) = self.generator_command {
            config.generator_command = Some(cmd);
        }
        if let Some(locator) = self.locator {
            config.locator = locator;
        }
        if let Some(dir) = self.log_dir {
            config.log_dir = Some(dir);
        }
        config.dry_run |= self.dry_run;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PatcherConfig::default();
        assert_eq!(config.icon_dirs.len(), 6);
        assert_eq!(config.permissions, vec![RECORD_AUDIO_PERMISSION.to_string()]);
        assert_eq!(config.locator, LocatorKind::Lexical);
        assert_eq!(config.signing_script, "droidpatch-signing.gradle");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_icon_source_is_two_levels_up() {
        let config = PatcherConfig {
            project_root: PathBuf::from("/work/app/src-tauri/gen/android"),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_icon_source(),
            PathBuf::from("/work/app/src-tauri/gen/android/../../icons/android")
        );
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ConfigOverrides {
            project_root: Some(PathBuf::from("/tmp/android")),
            locator: Some(LocatorKind::Raw),
            dry_run: true,
            ..Default::default()
        };
        let config = overrides.apply(PatcherConfig::default());
        assert_eq!(config.project_root, PathBuf::from("/tmp/android"));
        assert_eq!(config.locator, LocatorKind::Raw);
        assert!(config.dry_run);
    }

    #[test]
    fn test_disabled_bridge_is_skipped() {
        let toggles = CapabilityToggles {
            mic_permission: false,
            ..Default::default()
        };
        assert_eq!(
            toggles.bridges(),
            vec![Capability::FolderPicker, Capability::SpeechRecognition]
        );
        assert!(toggles.is_enabled(Capability::ImmersiveMode));
    }
}
