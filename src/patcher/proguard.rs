//! Release keep rules for the bridge entry points.

use super::markers::{marker_for, Capability, MarkerRole};
use super::templates::keep_rule;
use super::TextPatch;

/// Append each missing capability rule, gated by its own marker
pub fn patch_keep_rules(text: &str, bridges: &[Capability]) -> TextPatch {
    let mut patch = TextPatch::unchanged(text);

    for &capability in bridges {
        let Some(marker) = marker_for(capability, MarkerRole::KeepRule) else {
            continue;
        };
        if marker.is_present(&patch.text) {
            continue;
        }
        let Some(rule) = keep_rule(capability) else {
            continue;
        };

        if !patch.text.is_empty() && !patch.text.ends_with('\n') {
            patch.text.push('\n');
        }
        if !patch.text.is_empty() {
            patch.text.push('\n');
        }
        patch.text.push_str(&rule);
        patch.note(format!("added keep rule {}", marker.text));
    }

    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = "# Add project specific ProGuard rules here.\n-keep class app.tauri.** { *; }";

    #[test]
    fn test_appends_all_three_rules() {
        let patch = patch_keep_rules(RULES, &Capability::BRIDGES);
        assert_eq!(patch.notes.len(), 3);
        assert!(patch.text.starts_with(RULES));
        assert!(patch.text.contains("{ *; }\n\n# droidpatch:keep:folder-picker:v1\n"));
        assert!(patch.text.contains("drainSpeechEvents(int);"));
        assert_eq!(patch.text.matches("-keepclassmembers").count(), 3);
    }

    #[test]
    fn test_rules_are_gated_independently() {
        let partial = patch_keep_rules(RULES, &[Capability::MicPermission]);
        let full = patch_keep_rules(&partial.text, &Capability::BRIDGES);
        assert_eq!(full.notes.len(), 2);
        assert_eq!(full.text.matches("requestMicrophonePermissionBlocking").count(), 1);

        let again = patch_keep_rules(&full.text, &Capability::BRIDGES);
        assert_eq!(again.text, full.text);
        assert!(again.notes.is_empty());
    }

    #[test]
    fn test_empty_file() {
        let patch = patch_keep_rules("", &[Capability::FolderPicker]);
        assert!(patch.text.starts_with("# droidpatch:keep:folder-picker:v1\n"));
    }
}
