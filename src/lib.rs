//! droidpatch: idempotent patch engine for generated Android project trees.
//!
//! Runs once, ahead of compiling the Android artifact, and gives the
//! regenerated project the capabilities its generator does not emit:
//! extra permissions, blocking bridges from native code to asynchronous
//! platform flows (folder picker, microphone permission, speech
//! recognition), release signing, settings fallbacks and launcher icons.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Step, outcome and report types
//! - **config**: `droidpatch.toml` loading, overrides and validation
//! - **patcher**: Marker registry, structural locator, templates and the
//!   per-file patchers
//! - **orchestrator**: Target discovery, generator execution, step ordering
//! - **bridge**: Host-side model of the blocking bridge and speech event
//!   queue the injected code implements
//! - **log_collector**: `log` backend with optional disk persistence

pub mod bridge;
pub mod config;
pub mod error;
pub mod log_collector;
pub mod models;
pub mod orchestrator;
pub mod patcher;

// Re-export the log crate for macro usage
pub use log;

pub use config::{loader::resolve_config, ConfigOverrides, PatcherConfig};
pub use error::{BridgeError, ConfigError, OrchestratorError, PatchError, PatchResult};
pub use log_collector::{LogCollector, LogLine};
pub use models::{FileReport, PatchOutcome, PatchStep, RunReport};
pub use orchestrator::Orchestrator;
pub use patcher::ProjectPatcher;
