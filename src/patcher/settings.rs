//! Fallbacks for auxiliary settings scripts the generator references but
//! did not write.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::templates::settings_fallback;

static APPLY_FROM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*apply[ \t]*\(?[ \t]*from[ \t]*[:=][ \t]*["']([^"']+)["']"#)
        .expect("Invalid apply-from regex")
});

/// Local script paths pulled in through `apply from`
pub fn referenced_scripts(text: &str) -> Vec<String> {
    APPLY_FROM_REGEX
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|reference| !reference.contains("://"))
        .collect()
}

/// Fallback file contents for each referenced script missing on disk
pub fn plan_fallbacks(settings_file: &Path, text: &str) -> Vec<(PathBuf, String)> {
    let base = settings_file.parent().unwrap_or_else(|| Path::new("."));
    let mut planned: Vec<(PathBuf, String)> = Vec::new();

    for reference in referenced_scripts(text) {
        let path = base.join(&reference);
        if path.exists() || planned.iter().any(|(p, _)| *p == path) {
            continue;
        }
        let kotlin_dsl = path.extension().map_or(false, |ext| ext == "kts");
        planned.push((path, settings_fallback(kotlin_dsl)));
    }
    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_references() {
        let text = "include ':app'\napply from: 'tauri.settings.gradle'\napply(from = \"extra.settings.gradle.kts\")\napply from: \"https://example.com/x.gradle\"\n";
        assert_eq!(
            referenced_scripts(text),
            vec!["tauri.settings.gradle", "extra.settings.gradle.kts"]
        );
    }

    #[test]
    fn test_missing_reference_gets_fallback() {
        let dir = TempDir::new().unwrap();
        let settings = dir.path().join("settings.gradle");
        let planned = plan_fallbacks(&settings, "apply from: 'tauri.settings.gradle'\n");
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].0, dir.path().join("tauri.settings.gradle"));
        assert!(planned[0].1.contains("include ':app'"));
        assert!(planned[0].1.contains("mavenCentral()"));
    }

    #[test]
    fn test_kts_reference_gets_kotlin_fallback() {
        let dir = TempDir::new().unwrap();
        let settings = dir.path().join("settings.gradle.kts");
        let planned = plan_fallbacks(&settings, "apply(from = \"tauri.settings.gradle.kts\")\n");
        assert!(planned[0].1.contains("include(\":app\")"));
    }

    #[test]
    fn test_existing_or_unreferenced_is_noop() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tauri.settings.gradle"), "").unwrap();
        let settings = dir.path().join("settings.gradle");
        assert!(plan_fallbacks(&settings, "apply from: 'tauri.settings.gradle'\n").is_empty());
        assert!(plan_fallbacks(&settings, "include ':app'\n").is_empty());
    }
}
