//! Cross-patcher scenarios and properties over generated activity sources.

use std::fs;
use std::path::Path;

use proptest::prelude::*;
use tempfile::TempDir;

use super::activity::{patch_activity, ActivityOptions};
use super::locator::{BlockBoundaryLocator, LexicalBraceLocator};
use super::markers::{marker_for, Capability, MarkerRole, REGISTRY};
use super::templates::{hook_marker, ENTRY_POINTS, KEEP_ANNOTATION};
use super::ProjectPatcher;
use crate::config::PatcherConfig;
use crate::models::{PatchOutcome, PatchStep};

static LEXICAL: LexicalBraceLocator = LexicalBraceLocator;

const TAURI_ACTIVITY: &str = "package com.example.app\n\nclass MainActivity : TauriActivity()\n";

const MEMBER_POOL: [&str; 6] = [
    "    private val tag = \"app\"\n",
    "    override fun onCreate(savedInstanceState: Bundle?) {\n        super.onCreate(savedInstanceState)\n    }\n",
    "    override fun onDestroy() {\n        super.onDestroy()\n    }\n",
    "    override fun onActivityResult(requestCode: Int, resultCode: Int, data: Intent?) {\n        super.onActivityResult(requestCode, resultCode, data)\n    }\n",
    "    override fun onRequestPermissionsResult(code: Int, perms: Array<out String>, results: IntArray) {\n        super.onRequestPermissionsResult(code, perms, results)\n    }\n",
    "    fun wrap(name: String): String {\n        // closing } in a comment\n        return \"{\" + name + \"}\"\n    }\n",
];

fn activity_source(members: &[&str], single_line: bool) -> String {
    let mut text = String::from("package com.example.app\n\nimport android.content.Intent\nimport android.os.Bundle\n\n");
    if single_line && members.is_empty() {
        text.push_str("class MainActivity : TauriActivity()\n");
    } else {
        text.push_str("class MainActivity : TauriActivity() {\n");
        text.push_str(&members.join("\n"));
        text.push_str("}\n");
    }
    text
}

fn options(bridges: &[Capability]) -> ActivityOptions<'_> {
    ActivityOptions {
        class_name: None,
        bridges,
        locator: &LEXICAL,
    }
}

#[test]
fn test_missing_permission_callback_gets_one_override_and_one_core() {
    let bridges = [Capability::MicPermission];
    let first = patch_activity(TAURI_ACTIVITY, &options(&bridges)).unwrap();
    assert_eq!(first.text.matches("override fun onRequestPermissionsResult(").count(), 1);
    assert_eq!(first.text.matches("droidpatch:mic-permission:v1").count(), 1);

    let second = patch_activity(&first.text, &options(&bridges)).unwrap();
    assert_eq!(second.text, first.text);
}

#[test]
fn test_toggled_off_bridge_leaves_no_trace() {
    let first = patch_activity(TAURI_ACTIVITY, &options(&[Capability::FolderPicker])).unwrap();
    for cap in [Capability::MicPermission, Capability::SpeechRecognition] {
        for role in [MarkerRole::Core, MarkerRole::Hook] {
            let marker = marker_for(cap, role).unwrap();
            assert!(!marker.is_present(&first.text), "{:?} {:?}", cap, role);
        }
    }
    assert!(!first.text.contains("drainSpeechEvents"));
}

#[test]
fn test_enabling_more_bridges_later_extends_in_place() {
    let first = patch_activity(TAURI_ACTIVITY, &options(&[Capability::FolderPicker])).unwrap();
    let second = patch_activity(&first.text, &options(&Capability::BRIDGES)).unwrap();
    for cap in Capability::BRIDGES {
        let core = marker_for(cap, MarkerRole::Core).unwrap();
        assert_eq!(second.text.matches(core.text).count(), 1);
    }
    assert_eq!(second.text.matches("fun pickFolderBlocking").count(), 1);
    assert!(LEXICAL.is_balanced(&second.text));
}

fn write(root: &Path, rel: &str, content: &str) -> std::path::PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn patcher(root: &Path, dry_run: bool) -> ProjectPatcher {
    ProjectPatcher::new(PatcherConfig {
        project_root: root.to_path_buf(),
        dry_run,
        ..Default::default()
    })
}

#[test]
fn test_project_patcher_writes_once_then_reports_unchanged() {
    let tmp = TempDir::new().unwrap();
    let activity = write(tmp.path(), "app/src/main/java/MainActivity.kt", TAURI_ACTIVITY);

    let first = patcher(tmp.path(), false).patch_activity(&activity);
    assert_eq!(first.step, PatchStep::Activity);
    assert_eq!(first.outcome, PatchOutcome::Modified);
    let after_first = fs::read_to_string(&activity).unwrap();

    let second = patcher(tmp.path(), false).patch_activity(&activity);
    assert_eq!(second.outcome, PatchOutcome::Unchanged);
    assert_eq!(fs::read_to_string(&activity).unwrap(), after_first);
}

#[test]
fn test_dry_run_reports_without_writing() {
    let tmp = TempDir::new().unwrap();
    let activity = write(tmp.path(), "app/src/main/java/MainActivity.kt", TAURI_ACTIVITY);

    let report = patcher(tmp.path(), true).patch_activity(&activity);
    assert_eq!(report.outcome, PatchOutcome::Modified);
    assert_eq!(fs::read_to_string(&activity).unwrap(), TAURI_ACTIVITY);
}

#[test]
fn test_missing_file_is_failed_report() {
    let tmp = TempDir::new().unwrap();
    let report = patcher(tmp.path(), false).patch_keep_rules(&tmp.path().join("app/proguard-rules.pro"));
    assert!(report.outcome.is_failed());
}

#[test]
fn test_signing_writes_script_and_apply_line() {
    let tmp = TempDir::new().unwrap();
    let build = write(tmp.path(), "app/build.gradle", "plugins {\n    id 'com.android.application'\n}\n");

    let reports = patcher(tmp.path(), false).patch_signing(&build);
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.outcome == PatchOutcome::Modified));
    assert!(tmp.path().join("app/droidpatch-signing.gradle").is_file());
    assert!(fs::read_to_string(&build)
        .unwrap()
        .contains("}\n\napply from: 'droidpatch-signing.gradle'\n"));

    let again = patcher(tmp.path(), false).patch_signing(&build);
    assert!(again.iter().all(|r| r.outcome == PatchOutcome::Unchanged));
}

#[test]
fn test_foreign_signing_script_is_preserved() {
    let tmp = TempDir::new().unwrap();
    let build = write(tmp.path(), "app/build.gradle.kts", "plugins {\n}\n");
    let script = write(tmp.path(), "app/droidpatch-signing.gradle", "// hand written\n");

    let reports = patcher(tmp.path(), false).patch_signing(&build);
    assert_eq!(reports[0].outcome, PatchOutcome::Unchanged);
    assert_eq!(reports[0].notes.len(), 1);
    assert_eq!(fs::read_to_string(script).unwrap(), "// hand written\n");
    assert!(fs::read_to_string(build)
        .unwrap()
        .contains("apply(from = \"droidpatch-signing.gradle\")"));
}

#[test]
fn test_settings_fallback_created_once() {
    let tmp = TempDir::new().unwrap();
    let settings = write(tmp.path(), "settings.gradle", "include ':app'\napply from: 'tauri.settings.gradle'\n");

    let first = patcher(tmp.path(), false).patch_settings(&settings);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].outcome, PatchOutcome::Modified);
    assert!(tmp.path().join("tauri.settings.gradle").is_file());

    assert!(patcher(tmp.path(), false).patch_settings(&settings).is_empty());
}

#[test]
fn test_manifest_without_speech_has_no_queries() {
    let tmp = TempDir::new().unwrap();
    let manifest = write(
        tmp.path(),
        "app/src/main/AndroidManifest.xml",
        "<manifest xmlns:android=\"http://schemas.android.com/apk/res/android\">\n    <application />\n</manifest>\n",
    );
    let mut config = PatcherConfig {
        project_root: tmp.path().to_path_buf(),
        ..Default::default()
    };
    config.capabilities.speech_recognition = false;

    let report = ProjectPatcher::new(config).patch_manifest(&manifest);
    assert_eq!(report.outcome, PatchOutcome::Modified);
    let text = fs::read_to_string(manifest).unwrap();
    assert!(text.contains("android.permission.RECORD_AUDIO"));
    assert!(!text.contains("<queries>"));
}

#[test]
fn test_registry_markers_never_imply_each_other() {
    for a in REGISTRY.iter() {
        for b in REGISTRY.iter() {
            if a.text != b.text {
                assert!(!a.is_present(&format!("// {}", b.text)), "{} inside {}", a.text, b.text);
            }
        }
    }
}

fn members_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(MEMBER_POOL.to_vec(), 0..=MEMBER_POOL.len())
}

fn bridges_strategy() -> impl Strategy<Value = Vec<Capability>> {
    proptest::sample::subsequence(Capability::BRIDGES.to_vec(), 0..=Capability::BRIDGES.len())
}

proptest! {
    #[test]
    fn prop_second_run_is_identical(
        members in members_strategy(),
        bridges in bridges_strategy(),
        single_line in any::<bool>()
    ) {
        let source = activity_source(&members, single_line);
        let first = patch_activity(&source, &options(&bridges)).unwrap();
        let second = patch_activity(&first.text, &options(&bridges)).unwrap();
        prop_assert_eq!(second.text, first.text);
    }

    #[test]
    fn prop_braces_stay_balanced(
        members in members_strategy(),
        bridges in bridges_strategy()
    ) {
        let source = activity_source(&members, false);
        prop_assert!(LEXICAL.is_balanced(&source));
        let patched = patch_activity(&source, &options(&bridges)).unwrap();
        prop_assert!(LEXICAL.is_balanced(&patched.text));
    }

    #[test]
    fn prop_each_enabled_bridge_appears_exactly_once(
        members in members_strategy(),
        bridges in bridges_strategy()
    ) {
        let source = activity_source(&members, false);
        let patched = patch_activity(&source, &options(&bridges)).unwrap();

        for cap in Capability::BRIDGES {
            let expected = usize::from(bridges.contains(&cap));
            let core = marker_for(cap, MarkerRole::Core).unwrap();
            let hook = hook_marker(cap).unwrap();
            prop_assert_eq!(patched.text.matches(core.text).count(), expected);
            prop_assert_eq!(patched.text.matches(hook.text).count(), expected);
        }

        let entry_points = ENTRY_POINTS.iter().filter(|(cap, _)| bridges.contains(cap)).count();
        prop_assert_eq!(patched.text.matches(KEEP_ANNOTATION).count(), entry_points);
    }
}
