//! Integration tests for config resolution and CLI overrides feeding a run.
//!
//! - Loading: explicit file, cwd pickup, defaults
//! - Overrides: CLI values win over file values
//! - Validation: bad files never reach the patchers

use std::fs;
use std::path::PathBuf;

use droidpatch::config::loader::{load_config_from_file, save_config_to_file, DEFAULT_CONFIG_FILE};
use droidpatch::error::ConfigError;
use droidpatch::patcher::locator::LocatorKind;
use droidpatch::{resolve_config, ConfigOverrides, Orchestrator, PatcherConfig};
use tempfile::TempDir;

#[test]
fn test_cli_overrides_win_over_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(DEFAULT_CONFIG_FILE),
        "project_root = \"from-file\"\nlocator = \"lexical\"\n",
    )
    .unwrap();

    let (config, source) = resolve_config(None, dir.path()).unwrap();
    assert_eq!(source, Some(dir.path().join(DEFAULT_CONFIG_FILE)));

    let config = ConfigOverrides {
        project_root: Some(PathBuf::from("from-cli")),
        locator: Some(LocatorKind::Raw),
        dry_run: true,
        ..Default::default()
    }
    .apply(config);

    assert_eq!(config.project_root, PathBuf::from("from-cli"));
    assert_eq!(config.locator, LocatorKind::Raw);
    assert!(config.dry_run);
}

#[test]
fn test_duplicate_signing_names_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("droidpatch.toml");
    fs::write(
        &path,
        "[signing_env]\nkey_alias = \"ANDROID_KEY_PASSWORD\"\n",
    )
    .unwrap();

    assert!(matches!(
        load_config_from_file(&path),
        Err(ConfigError::ValidationFailed(_))
    ));
}

#[test]
fn test_saved_config_drives_a_run() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("gen/android");
    let activity = root.join("app/src/main/java/HostActivity.kt");
    fs::create_dir_all(activity.parent().unwrap()).unwrap();
    fs::write(&activity, "class HostActivity : TauriActivity()\n").unwrap();

    let mut config = PatcherConfig {
        project_root: PathBuf::from("gen/android"),
        activity_class: Some("HostActivity".to_string()),
        ..Default::default()
    };
    config.capabilities.folder_picker = false;
    config.capabilities.speech_recognition = false;
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    save_config_to_file(&config, &path).unwrap();

    let (loaded, _) = resolve_config(Some(&path), dir.path()).unwrap();
    let report = Orchestrator::new(loaded, dir.path()).run().unwrap();
    assert_eq!(report.exit_code(), 0);

    let text = fs::read_to_string(&activity).unwrap();
    assert!(text.contains("fun requestMicrophonePermissionBlocking("));
    assert!(!text.contains("fun pickFolderBlocking("));
}
