//! Android project patching with idempotent, marker-gated injection.
//!
//! Each submodule owns one target-file kind and exposes a pure text
//! transformation; [`ProjectPatcher`] wires those to the filesystem. Files
//! are read fresh, transformed as a value, and written back atomically only
//! when the text actually changed.

pub mod activity;
pub mod icons;
pub mod locator;
pub mod manifest;
pub mod markers;
pub mod proguard;
pub mod settings;
pub mod signing;
pub mod templates;

#[cfg(test)]
mod tests;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::{PatcherConfig, RECOGNITION_SERVICE_ACTION};
pub use crate::error::PatchResult;
use crate::error::PatchError;
use crate::models::{FileReport, PatchOutcome, PatchStep};
use locator::BlockBoundaryLocator;

/// Result of a text transformation: the new text plus non-fatal notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPatch {
    pub text: String,
    pub notes: Vec<String>,
}

impl TextPatch {
    pub fn unchanged(text: &str) -> Self {
        TextPatch {
            text: text.to_string(),
            notes: Vec::new(),
        }
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

/// Read a target file as UTF-8
pub fn read_target(path: &Path) -> PatchResult<String> {
    if !path.exists() {
        return Err(PatchError::FileNotFound(path.display().to_string()));
    }
    fs::read_to_string(path)
        .map_err(|e| PatchError::PatchFailed(format!("Failed to read {}: {}", path.display(), e)))
}

/// Replace `path` with `content` through a temp file in the same directory
pub fn write_atomic(path: &Path, content: &str) -> PatchResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        // Keep the original mode; a failure here only affects permissions
        let _ = fs::set_permissions(tmp.path(), meta.permissions());
    }
    tmp.persist(path).map_err(|e| {
        PatchError::PatchFailed(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;
    Ok(())
}

/// Write `updated` unless it equals `original`; dry runs never write
pub fn commit(path: &Path, original: Option<&str>, updated: &str, dry_run: bool) -> PatchResult<PatchOutcome> {
    if original == Some(updated) {
        return Ok(PatchOutcome::Unchanged);
    }
    if dry_run {
        log::info!("[Patcher] [DRY-RUN] would write {}", path.display());
        return Ok(PatchOutcome::Modified);
    }
    write_atomic(path, updated)?;
    Ok(PatchOutcome::Modified)
}

/// High-level patcher for orchestrator integration.
///
/// Holds the run configuration; every method handles exactly one target
/// file (or, for icons and generated scripts, one fixed set of files) and
/// reports instead of propagating, so one bad file never stops the run.
pub struct ProjectPatcher {
    project_root: PathBuf,
    config: PatcherConfig,
}

impl ProjectPatcher {
    pub fn new(config: PatcherConfig) -> Self {
        ProjectPatcher {
            project_root: config.project_root.clone(),
            config,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config(&self) -> &PatcherConfig {
        &self.config
    }

    pub fn locator(&self) -> &'static dyn BlockBoundaryLocator {
        self.config.locator.locator()
    }

    /// Read, transform, write; any error becomes a `Failed` report
    fn apply<F>(&self, step: PatchStep, path: &Path, transform: F) -> FileReport
    where
        F: FnOnce(&str) -> PatchResult<TextPatch>,
    {
        let result = read_target(path).and_then(|original| {
            let patch = transform(&original)?;
            let outcome = commit(path, Some(&original), &patch.text, self.config.dry_run)?;
            Ok((outcome, patch.notes))
        });

        match result {
            Ok((outcome, notes)) => {
                log::info!(
                    "[Patcher] [{}] {}: {}",
                    step.tag(),
                    path.display(),
                    if outcome.is_modified() { "modified" } else { "unchanged" }
                );
                FileReport::new(step, path.to_path_buf(), outcome).with_notes(notes)
            }
            Err(e) => {
                log::error!("[Patcher] [{}] {}: {}", step.tag(), path.display(), e);
                FileReport::new(step, path.to_path_buf(), PatchOutcome::Failed(e.to_string()))
            }
        }
    }

    pub fn patch_manifest(&self, path: &Path) -> FileReport {
        let actions: Vec<String> = if self.config.capabilities.speech_recognition {
            vec![RECOGNITION_SERVICE_ACTION.to_string()]
        } else {
            Vec::new()
        };
        self.apply(PatchStep::Manifest, path, |text| {
            manifest::patch_manifest(text, &self.config.permissions, &actions)
        })
    }

    pub fn patch_activity(&self, path: &Path) -> FileReport {
        let bridges = self.config.capabilities.bridges();
        let options = activity::ActivityOptions {
            class_name: self.config.activity_class.as_deref(),
            bridges: &bridges,
            locator: self.locator(),
        };
        self.apply(PatchStep::Activity, path, |text| activity::patch_activity(text, &options))
    }

    pub fn patch_keep_rules(&self, path: &Path) -> FileReport {
        let bridges = self.config.capabilities.bridges();
        self.apply(PatchStep::KeepRules, path, |text| {
            Ok(proguard::patch_keep_rules(text, &bridges))
        })
    }

    /// Refresh launcher icons; a missing source directory is an error the
    /// caller downgrades to a warning
    pub fn sync_icons(&self) -> PatchResult<Vec<FileReport>> {
        let source = self.config.resolved_icon_source();
        let res_dir = self.project_root.join("app").join("src").join("main").join("res");
        icons::sync_icons(&source, &res_dir, &self.config.icon_dirs, self.config.dry_run)
    }

    /// Generate the signing script next to `build_script` and include it
    pub fn patch_signing(&self, build_script: &Path) -> Vec<FileReport> {
        let module_dir = build_script.parent().unwrap_or(&self.project_root).to_path_buf();
        let script_path = module_dir.join(&self.config.signing_script);
        let names = self.config.signing_env.names();

        let status = signing::SigningProbe::new(names.clone()).evaluate(&module_dir);
        log::info!("[Patcher] [SIGNING] {}", status);

        let mut reports = vec![self.write_signing_script(&script_path, &names)];
        if reports[0].outcome.is_failed() {
            return reports;
        }

        let kotlin_dsl = build_script.extension().map_or(false, |ext| ext == "kts");
        let line = templates::signing_apply_line(&self.config.signing_script, kotlin_dsl);
        let locator = self.locator();
        reports.push(self.apply(PatchStep::Signing, build_script, |text| {
            signing::patch_build_script(text, &line, locator)
        }));
        reports
    }

    fn write_signing_script(&self, script_path: &Path, names: &[String; 4]) -> FileReport {
        let existing = match script_path.exists() {
            true => match read_target(script_path) {
                Ok(text) => Some(text),
                Err(e) => {
                    return FileReport::new(
                        PatchStep::Signing,
                        script_path.to_path_buf(),
                        PatchOutcome::Failed(e.to_string()),
                    )
                }
            },
            false => None,
        };

        let result = match signing::plan_signing_script(existing.as_deref(), names) {
            signing::ScriptPlan::Write(content) => {
                commit(script_path, existing.as_deref(), &content, self.config.dry_run)
                    .map(|outcome| (outcome, Vec::new()))
            }
            signing::ScriptPlan::Keep(reason) => Ok((PatchOutcome::Unchanged, vec![reason])),
        };

        match result {
            Ok((outcome, notes)) => {
                FileReport::new(PatchStep::Signing, script_path.to_path_buf(), outcome).with_notes(notes)
            }
            Err(e) => {
                log::error!("[Patcher] [SIGNING] {}: {}", script_path.display(), e);
                FileReport::new(PatchStep::Signing, script_path.to_path_buf(), PatchOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Create fallbacks for auxiliary settings scripts that are referenced
    /// but missing
    pub fn patch_settings(&self, settings_file: &Path) -> Vec<FileReport> {
        let text = match read_target(settings_file) {
            Ok(text) => text,
            Err(e) => {
                return vec![FileReport::new(
                    PatchStep::SettingsFallback,
                    settings_file.to_path_buf(),
                    PatchOutcome::Failed(e.to_string()),
                )]
            }
        };

        settings::plan_fallbacks(settings_file, &text)
            .into_iter()
            .map(|(path, content)| {
                let outcome = commit(&path, None, &content, self.config.dry_run)
                    .unwrap_or_else(|e| PatchOutcome::Failed(e.to_string()));
                log::info!("[Patcher] [SETTINGS] fallback {} ({:?})", path.display(), outcome);
                FileReport::new(PatchStep::SettingsFallback, path, outcome)
            })
            .collect()
    }
}
