//! Speech output for advisory text: voice themes, synthesis over HTTP,
//! and single-slot audio playback.

pub mod playback;
pub mod synthesis;
pub mod voices;

pub use playback::{AudioSink, RodioSink, SpeechController};
pub use synthesis::{HttpSpeechClient, SpeechSynthesis};
pub use voices::{default_voice, resolve_voice, VoiceTheme, VOICES};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Nothing to speak: input text is empty")]
    EmptyInput,

    #[error("Could not reach speech service at {0}")]
    Connection(String),

    #[error("Speech request timed out after {0}s")]
    Timeout(u64),

    #[error("Speech service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Audio file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Speech request was superseded by a newer one")]
    Superseded,

    #[error("Speech state lock poisoned")]
    LockPoisoned,
}
