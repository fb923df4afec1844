//! Launcher icon sync from a source asset directory into `res/`.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{PatchError, PatchResult};
use crate::models::{FileReport, PatchOutcome, PatchStep};

/// Copy every configured density directory from `source` into `res_dir`.
///
/// One report per directory. Files are always re-copied; the outcome is
/// `Modified` only when some destination bytes differed.
pub fn sync_icons(source: &Path, res_dir: &Path, dirs: &[String], dry_run: bool) -> PatchResult<Vec<FileReport>> {
    if !source.is_dir() {
        return Err(PatchError::FileNotFound(format!(
            "Icon source directory not found: {}",
            source.display()
        )));
    }

    let mut reports = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let src = source.join(dir);
        let dst = res_dir.join(dir);
        if !src.is_dir() {
            log::debug!("[Patcher] [ICONS] no source for {}", dir);
            reports.push(
                FileReport::new(PatchStep::IconSync, dst, PatchOutcome::Unchanged)
                    .with_notes(vec![format!("no icons for {} in source", dir)]),
            );
            continue;
        }

        let outcome = match copy_tree(&src, &dst, dry_run) {
            Ok(0) => PatchOutcome::Unchanged,
            Ok(changed) => {
                log::info!("[Patcher] [ICONS] {}: {} file(s) updated", dir, changed);
                PatchOutcome::Modified
            }
            Err(e) => {
                log::error!("[Patcher] [ICONS] {}: {}", dir, e);
                PatchOutcome::Failed(e.to_string())
            }
        };
        reports.push(FileReport::new(PatchStep::IconSync, dst, outcome));
    }
    Ok(reports)
}

/// Recursive overwrite; returns how many files differed beforehand
fn copy_tree(src: &Path, dst: &Path, dry_run: bool) -> PatchResult<usize> {
    let mut changed = 0;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| PatchError::PatchFailed(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| PatchError::PatchFailed(e.to_string()))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            if !dry_run {
                fs::create_dir_all(&target)?;
            }
            continue;
        }

        let bytes = fs::read(entry.path())?;
        if fs::read(&target).ok().as_deref() != Some(bytes.as_slice()) {
            changed += 1;
        }
        if !dry_run {
            fs::write(&target, &bytes)?;
        }
    }
    Ok(changed)
}
