//! Core data structures shared by the patchers and the orchestrator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Patcher step, in the order the orchestrator runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStep {
    Manifest,
    Activity,
    KeepRules,
    IconSync,
    Signing,
    SettingsFallback,
}

impl PatchStep {
    /// Fixed execution order.
    pub const ORDER: [PatchStep; 6] = [
        PatchStep::Manifest,
        PatchStep::Activity,
        PatchStep::KeepRules,
        PatchStep::IconSync,
        PatchStep::Signing,
        PatchStep::SettingsFallback,
    ];

    /// Log tag used in `[Patcher] [TAG]` messages
    pub fn tag(&self) -> &'static str {
        match self {
            PatchStep::Manifest => "MANIFEST",
            PatchStep::Activity => "ACTIVITY",
            PatchStep::KeepRules => "KEEP-RULES",
            PatchStep::IconSync => "ICONS",
            PatchStep::Signing => "SIGNING",
            PatchStep::SettingsFallback => "SETTINGS",
        }
    }

    /// Only the activity patch is elevated to fatal.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, PatchStep::Activity)
    }
}

/// Per-file outcome of one patcher invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PatchOutcome {
    Unchanged,
    Modified,
    Failed(String),
}

impl PatchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, PatchOutcome::Failed(_))
    }

    pub fn is_modified(&self) -> bool {
        matches!(self, PatchOutcome::Modified)
    }
}

/// Outcome of one patcher on one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub step: PatchStep,          // Step
    pub path: PathBuf,            // File
    pub outcome: PatchOutcome,    // Result
    pub notes: Vec<String>,       // Non-fatal warnings for this file
}

impl FileReport {
    pub fn new(step: PatchStep, path: PathBuf, outcome: PatchOutcome) -> Self {
        FileReport {
            step,
            path,
            outcome,
            notes: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Aggregated outcome of a whole orchestrator run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub project_root: PathBuf,       // Tree
    pub project_present: bool,       // Generated?
    pub dry_run: bool,               // Writes skipped?
    pub files: Vec<FileReport>,      // Per-file
    pub warnings: Vec<String>,       // Degraded steps
    pub mandatory_failure: Option<String>, // Fatal
}

impl RunReport {
    pub fn new(project_root: PathBuf, dry_run: bool) -> Self {
        RunReport {
            project_root,
            dry_run,
            ..Default::default()
        }
    }

    pub fn push(&mut self, report: FileReport) {
        self.files.push(report);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Reports for a single step
    pub fn step_reports(&self, step: PatchStep) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(move |r| r.step == step)
    }

    pub fn modified_count(&self) -> usize {
        self.files.iter().filter(|r| r.outcome.is_modified()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|r| r.outcome.is_failed()).count()
    }

    /// 0 on success or graceful no-op, 1 when a mandatory step failed
    pub fn exit_code(&self) -> i32 {
        if self.mandatory_failure.is_some() {
            1
        } else {
            0
        }
    }
}
