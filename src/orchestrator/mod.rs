//! Patch orchestration: Manifest -> Activity -> Keep-Rules -> Icon Sync ->
//! Signing -> Settings Fallback.
//!
//! Only the activity step is mandatory. Every other failure is recorded as a
//! warning on the [`RunReport`] and the run continues.

pub mod discovery;
pub mod executor;

use std::path::{Path, PathBuf};

pub use discovery::{discover, ProjectLayout};
pub use executor::run_generator;

use crate::config::PatcherConfig;
use crate::error::{OrchestratorError, PatchError};
use crate::models::{FileReport, PatchOutcome, PatchStep, RunReport};
use crate::patcher::ProjectPatcher;

/// Drives one patch run over a generated project tree.
pub struct Orchestrator {
    patcher: ProjectPatcher,
    workdir: PathBuf,
}

impl Orchestrator {
    /// `workdir` is where the generator command runs and where a relative
    /// project root is resolved.
    pub fn new(config: PatcherConfig, workdir: &Path) -> Self {
        let mut config = config;
        if config.project_root.is_relative() {
            config.project_root = workdir.join(&config.project_root);
        }
        if let Some(icons) = config.icon_source.as_mut() {
            if icons.is_relative() {
                *icons = workdir.join(&*icons);
            }
        }
        Orchestrator {
            patcher: ProjectPatcher::new(config),
            workdir: workdir.to_path_buf(),
        }
    }

    pub fn config(&self) -> &PatcherConfig {
        self.patcher.config()
    }

    /// Run the generator (if configured), then every patch step.
    pub fn run(&self) -> Result<RunReport, OrchestratorError> {
        if let Some(cmd) = &self.config().generator_command {
            run_generator(cmd, &self.workdir)?;
        }
        Ok(self.patch())
    }

    /// Every patch step in fixed order; never fails, only reports.
    pub fn patch(&self) -> RunReport {
        let config = self.config();
        let root = self.patcher.project_root();
        let mut report = RunReport::new(root.to_path_buf(), config.dry_run);

        if !root.is_dir() {
            report.warn(format!(
                "[Patcher] [SKIP] generated project not found at {}; nothing to patch",
                root.display()
            ));
            return report;
        }
        report.project_present = true;
        log::info!(
            "[Patcher] [START] patching {}{}",
            root.display(),
            if config.dry_run { " (dry run)" } else { "" }
        );

        let layout = discover(root, config.activity_class.as_deref());
        for step in PatchStep::ORDER {
            self.run_step(step, &layout, &mut report);
        }

        log::info!(
            "[Patcher] [DONE] {} file(s) modified, {} failed, {} warning(s)",
            report.modified_count(),
            report.failed_count(),
            report.warnings.len()
        );
        report
    }

    fn run_step(&self, step: PatchStep, layout: &ProjectLayout, report: &mut RunReport) {
        let config = self.config();
        let toggles = &config.capabilities;

        let reports: Vec<FileReport> = match step {
            PatchStep::Manifest => {
                if layout.manifests.is_empty() {
                    report.warn("[Patcher] [MANIFEST] no AndroidManifest.xml found");
                }
                layout.manifests.iter().map(|p| self.patcher.patch_manifest(p)).collect()
            }
            PatchStep::Activity => {
                let reports: Vec<FileReport> =
                    layout.activities.iter().map(|p| self.patcher.patch_activity(p)).collect();
                if reports.is_empty() {
                    report.mandatory_failure = Some("no main activity source file found".to_string());
                } else if reports.iter().all(|r| r.outcome.is_failed()) {
                    report.mandatory_failure = Some("every activity file failed to patch".to_string());
                }
                reports
            }
            PatchStep::KeepRules => {
                if toggles.bridges().is_empty() {
                    Vec::new()
                } else {
                    match &layout.keep_rules {
                        Some(path) => vec![self.patcher.patch_keep_rules(path)],
                        None => {
                            report.warn("[Patcher] [KEEP-RULES] app/proguard-rules.pro not found");
                            Vec::new()
                        }
                    }
                }
            }
            PatchStep::IconSync => {
                if !toggles.icon_sync {
                    Vec::new()
                } else {
                    match self.patcher.sync_icons() {
                        Ok(reports) => reports,
                        Err(PatchError::FileNotFound(msg)) => {
                            report.warn(format!("[Patcher] [ICONS] {}", msg));
                            Vec::new()
                        }
                        Err(e) => {
                            report.warn(format!("[Patcher] [ICONS] sync failed: {}", e));
                            Vec::new()
                        }
                    }
                }
            }
            PatchStep::Signing => {
                if !toggles.release_signing {
                    Vec::new()
                } else {
                    match &layout.build_script {
                        Some(path) => self.patcher.patch_signing(path),
                        None => {
                            report.warn("[Patcher] [SIGNING] app build script not found");
                            Vec::new()
                        }
                    }
                }
            }
            PatchStep::SettingsFallback => {
                if !toggles.settings_fallback {
                    Vec::new()
                } else {
                    match &layout.settings {
                        Some(path) => self.patcher.patch_settings(path),
                        None => {
                            log::debug!("[Patcher] [SETTINGS] no settings file");
                            Vec::new()
                        }
                    }
                }
            }
        };

        for file_report in reports {
            if !step.is_mandatory() {
                if let PatchOutcome::Failed(reason) = &file_report.outcome {
                    report.warn(format!(
                        "[Patcher] [{}] {} degraded: {}",
                        step.tag(),
                        file_report.path.display(),
                        reason
                    ));
                }
            }
            report.push(file_report);
        }
    }
}
