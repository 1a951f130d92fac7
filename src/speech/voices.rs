//! Voice themes offered for spoken advisories.

use tracing::warn;

/// A selectable voice on the speech service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceTheme {
    pub id: &'static str,
    pub description: &'static str,
}

/// Every voice the speech service supports, in presentation order.
pub const VOICES: &[VoiceTheme] = &[
    VoiceTheme {
        id: "alloy",
        description: "Neutral, balanced voice with clear articulation",
    },
    VoiceTheme {
        id: "echo",
        description: "Deep, resonant voice with a measured pace",
    },
    VoiceTheme {
        id: "fable",
        description: "Warm, friendly voice with expressive tones",
    },
    VoiceTheme {
        id: "onyx",
        description: "Rich, authoritative voice with depth",
    },
    VoiceTheme {
        id: "nova",
        description: "Bright, energetic voice with upbeat delivery",
    },
    VoiceTheme {
        id: "shimmer",
        description: "Soft, gentle voice with a soothing quality",
    },
    VoiceTheme {
        id: "ballad",
        description: "Warm, refined, and gently instructive",
    },
    VoiceTheme {
        id: "sage",
        description: "Friendly, clear, and reassuring",
    },
];

/// The voice used when none was chosen.
pub fn default_voice() -> &'static VoiceTheme {
    &VOICES[0]
}

/// Look up a voice by id, falling back to the default for anything the
/// service would reject.
pub fn resolve_voice(id: &str) -> &'static VoiceTheme {
    match VOICES.iter().find(|v| v.id == id) {
        Some(voice) => voice,
        None => {
            warn!(requested = id, fallback = default_voice().id, "Unknown voice requested");
            default_voice()
        }
    }
}
