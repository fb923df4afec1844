//! Runtime model of the blocking bridges generated into the activity.
//!
//! The Kotlin emitted by [`crate::patcher::templates`] and the types here
//! implement one protocol. A dispatch thread calls a blocking entry point,
//! the entry point posts work to the UI thread and waits on a monitor, and a
//! platform callback on another thread completes the monitor. Constants that
//! the generated code embeds are defined once, here.
//!
//! The model is also what an embedding runtime uses to decode drained
//! speech events ([`events::parse_drained`]).

pub mod events;
pub mod monitor;
pub mod session;

use std::time::Duration;

pub use events::{parse_drained, EventQueue, SpeechEvent, SpeechState};
pub use monitor::{BridgeMonitor, BridgeState};
pub use session::SpeechContext;

/// Default wait for the system folder picker
pub const FOLDER_PICKER_TIMEOUT: Duration = Duration::from_secs(120);

/// Default wait for the microphone permission dialog
pub const MIC_PERMISSION_TIMEOUT: Duration = Duration::from_secs(60);

/// Default wait for the recognizer to report ready (or fail)
pub const SPEECH_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Hard bound on queued speech events; the oldest is evicted when full
pub const SPEECH_QUEUE_CAPACITY: usize = 64;

/// Hard cap on events returned by one drain call
pub const SPEECH_DRAIN_MAX: usize = 32;

/// Minimum spacing between amplitude events accepted from the recognizer
pub const AMPLITUDE_MIN_INTERVAL: Duration = Duration::from_millis(100);
