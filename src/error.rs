//! Unified error type hierarchy for droidpatch
//!
//! Provides structured error handling with PatchError, ConfigError,
//! OrchestratorError and BridgeError.

use std::io;
use thiserror::Error;

/// Project patching operation errors.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Patch target file not found: {0}")]
    FileNotFound(String),

    #[error("Patch application failed: {0}")]
    PatchFailed(String),

    #[error("Structural anchor not found: {0}")]
    LocatorMiss(String),

    #[error("Patch validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during patching: {0}")]
    Io(#[from] io::Error),
}

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Errors that abort a whole orchestrator invocation.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The upstream generator exited non-zero (`None` when killed by a signal)
    #[error("Generator command '{cmd}' exited with status {code:?}")]
    GeneratorFailed { cmd: String, code: Option<i32> },

    #[error("Failed to launch generator command '{cmd}': {reason}")]
    GeneratorSpawn { cmd: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl OrchestratorError {
    /// Process exit status this error maps to
    pub fn exit_code(&self) -> i32 {
        match self {
            OrchestratorError::GeneratorFailed { code: Some(code), .. } if *code != 0 => *code,
            OrchestratorError::GeneratorFailed { .. } => 2,
            OrchestratorError::GeneratorSpawn { .. } => 2,
            OrchestratorError::Config(_) => 1,
        }
    }
}

/// Outcomes of the blocking bridge model that are not a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Bridge busy: a request is already in flight")]
    Busy,

    #[error("Bridge timed out after {0} ms")]
    Timeout(u64),

    #[error("Bridge request cancelled")]
    Cancelled,

    #[error("Bridge request failed: {0}")]
    Failed(String),

    #[error("Request code {0} does not match the pending request")]
    StaleRequest(i32),
}

/// Result type for patching operations
pub type PatchResult<T> = std::result::Result<T, PatchError>;
