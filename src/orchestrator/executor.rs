//! Upstream generator execution.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::OrchestratorError;

fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.args(["/C", cmd]);
        command
    } else {
        let mut command = Command::new("sh");
        command.args(["-c", cmd]);
        command
    }
}

/// Run `cmd` through the platform shell in `cwd`, inheriting stdio.
///
/// A non-zero exit (or death by signal) aborts the run before any patching.
pub fn run_generator(cmd: &str, cwd: &Path) -> Result<(), OrchestratorError> {
    log::info!("[Patcher] [GENERATE] running '{}' in {}", cmd, cwd.display());

    let status = shell_command(cmd)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .status()
        .map_err(|e| OrchestratorError::GeneratorSpawn {
            cmd: cmd.to_string(),
            reason: e.to_string(),
        })?;

    if status.success() {
        log::info!("[Patcher] [GENERATE] '{}' finished", cmd);
        Ok(())
    } else {
        log::error!("[Patcher] [GENERATE] '{}' failed with {}", cmd, status);
        Err(OrchestratorError::GeneratorFailed {
            cmd: cmd.to_string(),
            code: status.code(),
        })
    }
}
