//! Locating patch targets inside the generated project tree.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Directories never searched: build outputs, IDE state, JS dependencies
const SKIPPED_DIRS: [&str; 5] = ["build", ".gradle", ".cxx", ".idea", "node_modules"];

const DEFAULT_ACTIVITY_FILE: &str = "MainActivity.kt";

/// Every target the orchestrator may hand to a patcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectLayout {
    pub manifests: Vec<PathBuf>,
    pub activities: Vec<PathBuf>,
    pub keep_rules: Option<PathBuf>,
    pub build_script: Option<PathBuf>,
    pub settings: Option<PathBuf>,
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| SKIPPED_DIRS.contains(&name))
}

fn under_src_main(path: &Path) -> bool {
    path.components()
        .collect::<Vec<_>>()
        .windows(2)
        .any(|w| w[0].as_os_str() == "src" && w[1].as_os_str() == "main")
}

/// First existing file among `candidates`, relative to `root`
fn first_existing(root: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates.iter().map(|c| root.join(c)).find(|p| p.is_file())
}

/// Walk `root` once and classify matches. Paths come back sorted, manifests
/// under `src/main` first.
pub fn discover(root: &Path, activity_class: Option<&str>) -> ProjectLayout {
    let activity_file = activity_class
        .map(|name| format!("{}.kt", name))
        .unwrap_or_else(|| DEFAULT_ACTIVITY_FILE.to_string());

    let mut layout = ProjectLayout::default();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file());

    for entry in walker {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        if name == "AndroidManifest.xml" {
            layout.manifests.push(path.to_path_buf());
        } else if name == activity_file.as_str() && under_src_main(path) {
            layout.activities.push(path.to_path_buf());
        }
    }

    layout.manifests.sort_by_key(|p| (!under_src_main(p), p.clone()));
    layout.activities.sort();

    layout.keep_rules = first_existing(root, &["app/proguard-rules.pro"]);
    layout.build_script = first_existing(root, &["app/build.gradle.kts", "app/build.gradle"]);
    layout.settings = first_existing(root, &["settings.gradle.kts", "settings.gradle"]);

    log::debug!(
        "[Patcher] [DISCOVERY] {} manifest(s), {} activity file(s) under {}",
        layout.manifests.len(),
        layout.activities.len(),
        root.display()
    );
    layout
}
