//! Capability markers: the textual sentinels that record "already patched".
//!
//! The patched file is the only source of truth. Presence of the exact marker
//! text is the sole idempotence signal for a capability, so a marker string is
//! never reused for different generated content. Changing what a block emits
//! means minting the next revision (`v2`) and retiring the old one.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Injectable (or retired) capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    FolderPicker,
    MicPermission,
    SpeechRecognition,
    /// Deprecated fullscreen mode, only ever removed
    ImmersiveMode,
    ReleaseSigning,
    SettingsFallback,
}

impl Capability {
    /// Capabilities injected into the main activity, in injection order.
    pub const BRIDGES: [Capability; 3] = [
        Capability::FolderPicker,
        Capability::MicPermission,
        Capability::SpeechRecognition,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Capability::FolderPicker => "FOLDER-PICKER",
            Capability::MicPermission => "MIC-PERMISSION",
            Capability::SpeechRecognition => "SPEECH",
            Capability::ImmersiveMode => "IMMERSIVE",
            Capability::ReleaseSigning => "SIGNING",
            Capability::SettingsFallback => "SETTINGS",
        }
    }
}

/// What part of a capability a marker stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerRole {
    /// Bridge state + blocking entry points
    Core,
    /// Dispatch into (or fresh override of) a lifecycle callback
    Hook,
    /// Release optimizer keep rule
    KeepRule,
    /// Capability being removed from patched files
    Retired,
    /// Standalone generated build script
    Script,
}

/// One registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub capability: Capability,
    pub role: MarkerRole,
    pub text: &'static str,
}

impl Marker {
    /// True when the marker text occurs anywhere in `content`
    pub fn is_present(&self, content: &str) -> bool {
        content.contains(self.text)
    }
}

pub const FOLDER_PICKER_CORE: Marker = Marker {
    capability: Capability::FolderPicker,
    role: MarkerRole::Core,
    text: "droidpatch:folder-picker:v1",
};
pub const FOLDER_PICKER_HOOK: Marker = Marker {
    capability: Capability::FolderPicker,
    role: MarkerRole::Hook,
    text: "droidpatch:folder-picker-hook:v1",
};
pub const FOLDER_PICKER_KEEP: Marker = Marker {
    capability: Capability::FolderPicker,
    role: MarkerRole::KeepRule,
    text: "droidpatch:keep:folder-picker:v1",
};

pub const MIC_PERMISSION_CORE: Marker = Marker {
    capability: Capability::MicPermission,
    role: MarkerRole::Core,
    text: "droidpatch:mic-permission:v1",
};
pub const MIC_PERMISSION_HOOK: Marker = Marker {
    capability: Capability::MicPermission,
    role: MarkerRole::Hook,
    text: "droidpatch:mic-permission-hook:v1",
};
pub const MIC_PERMISSION_KEEP: Marker = Marker {
    capability: Capability::MicPermission,
    role: MarkerRole::KeepRule,
    text: "droidpatch:keep:mic-permission:v1",
};

pub const SPEECH_CORE: Marker = Marker {
    capability: Capability::SpeechRecognition,
    role: MarkerRole::Core,
    text: "droidpatch:speech-recognition:v1",
};
pub const SPEECH_HOOK: Marker = Marker {
    capability: Capability::SpeechRecognition,
    role: MarkerRole::Hook,
    text: "droidpatch:speech-recognition-hook:v1",
};
pub const SPEECH_KEEP: Marker = Marker {
    capability: Capability::SpeechRecognition,
    role: MarkerRole::KeepRule,
    text: "droidpatch:keep:speech-recognition:v1",
};

pub const IMMERSIVE_RETIRED: Marker = Marker {
    capability: Capability::ImmersiveMode,
    role: MarkerRole::Retired,
    text: "droidpatch:immersive-mode:v1",
};

pub const RELEASE_SIGNING: Marker = Marker {
    capability: Capability::ReleaseSigning,
    role: MarkerRole::Script,
    text: "droidpatch:release-signing:v1",
};

pub const SETTINGS_FALLBACK: Marker = Marker {
    capability: Capability::SettingsFallback,
    role: MarkerRole::Script,
    text: "droidpatch:settings-fallback:v1",
};

/// Stable identifying comment above injected manifest declarations. Not an
/// idempotence signal: the permission identifiers themselves are.
pub const MANIFEST_BLOCK_COMMENT: &str = "droidpatch:permissions";

/// Every marker the engine knows about.
pub const REGISTRY: &[Marker] = &[
    FOLDER_PICKER_CORE,
    FOLDER_PICKER_HOOK,
    FOLDER_PICKER_KEEP,
    MIC_PERMISSION_CORE,
    MIC_PERMISSION_HOOK,
    MIC_PERMISSION_KEEP,
    SPEECH_CORE,
    SPEECH_HOOK,
    SPEECH_KEEP,
    IMMERSIVE_RETIRED,
    RELEASE_SIGNING,
    SETTINGS_FALLBACK,
];

/// Look up the marker for a capability and role
pub fn marker_for(capability: Capability, role: MarkerRole) -> Option<&'static Marker> {
    REGISTRY
        .iter()
        .find(|m| m.capability == capability && m.role == role)
}

/// Integer codes the platform callback API uses to route results back.
///
/// Each capability owns a disjoint range; invocations walk through it so a
/// late callback from an abandoned request is recognizable as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestCodeRange {
    pub base: i32,
    pub span: i32,
}

impl RequestCodeRange {
    pub fn contains(&self, code: i32) -> bool {
        self.as_range().contains(&code)
    }

    pub fn as_range(&self) -> Range<i32> {
        self.base..self.base + self.span
    }

    /// Code for the given invocation sequence number, wrapping inside the range
    pub fn code_for(&self, sequence: u32) -> i32 {
        self.base + (sequence % self.span as u32) as i32
    }

    pub fn overlaps(&self, other: &RequestCodeRange) -> bool {
        self.base < other.base + other.span && other.base < self.base + self.span
    }
}

pub fn request_codes(capability: Capability) -> Option<RequestCodeRange> {
    match capability {
        Capability::FolderPicker => Some(RequestCodeRange { base: 41_000, span: 100 }),
        Capability::MicPermission => Some(RequestCodeRange { base: 41_100, span: 100 }),
        Capability::SpeechRecognition => Some(RequestCodeRange { base: 41_200, span: 100 }),
        _ => None,
    }
}
