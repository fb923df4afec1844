//! Release signing: the generated script and its inclusion in the app
//! build script.

use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::locator::{line_end_inclusive, BlockBoundaryLocator};
use super::markers::RELEASE_SIGNING;
use super::templates::signing_script;
use super::TextPatch;
use crate::error::PatchResult;

static PLUGINS_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*plugins[ \t]*\{").expect("Invalid plugins block regex")
});

/// What to do with the signing script on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptPlan {
    Write(String),
    Keep(String),
}

/// Regenerate our own script; never replace a file we did not write.
pub fn plan_signing_script(existing: Option<&str>, env: &[String; 4]) -> ScriptPlan {
    match existing {
        Some(text) if !RELEASE_SIGNING.is_present(text) => ScriptPlan::Keep(
            "signing script exists without the droidpatch marker; left untouched".to_string(),
        ),
        _ => ScriptPlan::Write(signing_script(env)),
    }
}

/// Insert `apply_line` after the `plugins { }` block, else at the top.
///
/// The inclusion line itself is the idempotence signal.
pub fn patch_build_script(
    text: &str,
    apply_line: &str,
    locator: &dyn BlockBoundaryLocator,
) -> PatchResult<TextPatch> {
    let mut patch = TextPatch::unchanged(text);
    if text.contains(apply_line) {
        return Ok(patch);
    }

    let plugins_end = PLUGINS_BLOCK_REGEX
        .find(text)
        .and_then(|m| locator.find_block_end(text, m.end() - 1));

    match plugins_end {
        Some(close) => {
            let at = line_end_inclusive(text, close);
            let lead = if text[..at].ends_with('\n') { "" } else { "\n" };
            patch.text.insert_str(at, &format!("{}\n{}\n", lead, apply_line));
            patch.note("signing script applied after plugins block");
        }
        None => {
            patch.text = format!("{}\n{}", apply_line, text);
            patch.note("no plugins block found, signing script applied at top");
        }
    }
    Ok(patch)
}

/// Whether the current environment would produce a signed release
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningStatus {
    Ready { keystore: PathBuf },
    MissingVariables(Vec<String>),
    MissingKeystore(PathBuf),
}

impl fmt::Display for SigningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningStatus::Ready { keystore } => {
                write!(f, "release builds will be signed with {}", keystore.display())
            }
            SigningStatus::MissingVariables(names) => {
                write!(f, "release signing skipped, unset: {}", names.join(", "))
            }
            SigningStatus::MissingKeystore(path) => {
                write!(f, "release signing skipped, keystore not found: {}", path.display())
            }
        }
    }
}

/// Patch-time mirror of the gate the generated script evaluates at build
/// time.
pub struct SigningProbe {
    names: [String; 4],
}

impl SigningProbe {
    pub fn new(names: [String; 4]) -> Self {
        SigningProbe { names }
    }

    pub fn evaluate(&self, module_dir: &Path) -> SigningStatus {
        self.evaluate_with(|name| std::env::var(name).ok(), module_dir)
    }

    /// Relative keystore paths resolve against the module directory, as
    /// Gradle's `file()` does.
    pub fn evaluate_with<F>(&self, lookup: F, module_dir: &Path) -> SigningStatus
    where
        F: Fn(&str) -> Option<String>,
    {
        let values: Vec<Option<String>> = self
            .names
            .iter()
            .map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
            .collect();

        let missing: Vec<String> = self
            .names
            .iter()
            .zip(&values)
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| name.clone())
            .collect();
        if !missing.is_empty() {
            return SigningStatus::MissingVariables(missing);
        }

        let raw = PathBuf::from(values[0].as_deref().unwrap_or_default());
        let keystore = if raw.is_absolute() { raw } else { module_dir.join(raw) };
        if keystore.is_file() {
            SigningStatus::Ready { keystore }
        } else {
            SigningStatus::MissingKeystore(keystore)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningEnv;
    use crate::patcher::locator::{LexicalBraceLocator, RawBraceLocator};
    use std::collections::HashMap;
    use tempfile::TempDir;

    const KTS: &str = "plugins {\n    id(\"com.android.application\")\n    id(\"rust\")\n}\n\nandroid {\n    compileSdk = 34\n}\n";
    const LINE: &str = "apply(from = \"droidpatch-signing.gradle\")";

    #[test]
    fn test_apply_after_plugins() {
        let patch = patch_build_script(KTS, LINE, &LexicalBraceLocator).unwrap();
        assert!(patch.text.starts_with("plugins {\n    id(\"com.android.application\")\n    id(\"rust\")\n}\n\napply(from = \"droidpatch-signing.gradle\")\n\nandroid {"));
    }

    #[test]
    fn test_apply_prepended_without_plugins() {
        let groovy = "apply plugin: 'com.android.application'\n";
        let line = "apply from: 'droidpatch-signing.gradle'";
        let patch = patch_build_script(groovy, line, &RawBraceLocator).unwrap();
        assert_eq!(patch.text, format!("{}\n{}", line, groovy));
    }

    #[test]
    fn test_apply_line_is_idempotent() {
        let first = patch_build_script(KTS, LINE, &LexicalBraceLocator).unwrap();
        let second = patch_build_script(&first.text, LINE, &LexicalBraceLocator).unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(second.text.matches(LINE).count(), 1);
    }

    #[test]
    fn test_plugins_block_at_eof() {
        let text = "plugins {\n    id(\"rust\")\n}";
        let patch = patch_build_script(text, LINE, &LexicalBraceLocator).unwrap();
        assert_eq!(patch.text, format!("{}\n\n{}\n", text, LINE));
    }

    #[test]
    fn test_foreign_script_is_kept() {
        let env = SigningEnv::default().names();
        assert!(matches!(plan_signing_script(Some("android {}"), &env), ScriptPlan::Keep(_)));
        assert!(matches!(plan_signing_script(None, &env), ScriptPlan::Write(_)));
        let ours = signing_script(&env);
        assert_eq!(plan_signing_script(Some(ours.as_str()), &env), ScriptPlan::Write(ours.clone()));
    }

    fn lookup(map: HashMap<&'static str, String>) -> impl Fn(&str) -> Option<String> {
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_probe_requires_all_variables() {
        let dir = TempDir::new().unwrap();
        let probe = SigningProbe::new(SigningEnv::default().names());
        let mut vars = HashMap::new();
        vars.insert("ANDROID_KEYSTORE_PATH", "release.jks".to_string());
        vars.insert("ANDROID_KEYSTORE_PASSWORD", "secret".to_string());
        vars.insert("ANDROID_KEY_ALIAS", "  ".to_string());

        match probe.evaluate_with(lookup(vars), dir.path()) {
            SigningStatus::MissingVariables(missing) => {
                assert_eq!(missing, vec!["ANDROID_KEY_ALIAS", "ANDROID_KEY_PASSWORD"]);
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[test]
    fn test_probe_requires_keystore_file() {
        let dir = TempDir::new().unwrap();
        let probe = SigningProbe::new(SigningEnv::default().names());
        let vars: HashMap<&'static str, String> = [
            ("ANDROID_KEYSTORE_PATH", "release.jks".to_string()),
            ("ANDROID_KEYSTORE_PASSWORD", "secret".to_string()),
            ("ANDROID_KEY_ALIAS", "upload".to_string()),
            ("ANDROID_KEY_PASSWORD", "secret".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            probe.evaluate_with(lookup(vars.clone()), dir.path()),
            SigningStatus::MissingKeystore(dir.path().join("release.jks"))
        );

        std::fs::write(dir.path().join("release.jks"), b"jks").unwrap();
        assert_eq!(
            probe.evaluate_with(lookup(vars), dir.path()),
            SigningStatus::Ready { keystore: dir.path().join("release.jks") }
        );
    }

    #[test]
    fn test_generated_script_gates_on_every_variable() {
        let script = signing_script(&SigningEnv::default().names());
        for name in SigningEnv::default().names() {
            assert!(script.contains(&format!("System.getenv(\"{}\")", name)));
        }
        assert!(script.contains(".every { it != null && !it.trim().isEmpty() } && file(droidpatchKeystorePath).exists()"));
        assert!(script.starts_with("// droidpatch:release-signing:v1\n"));
    }
}
