pub mod config;
pub mod gateway;
pub mod intake;
pub mod note;
pub mod playback;

pub use config::GatewayConfig;
pub use gateway::{GatewayError, StructuringResult, TranscriptionBackend};
pub use intake::{AudioInput, EncounterMeta, IntakeError, RawAudio, SourceKind};
pub use note::StructuredNote;

use serde::{Deserialize, Serialize};

/// Per-file transcript returned by the transcription backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptFile {
    pub filename: String,
    pub transcript: String,
    #[serde(default)]
    pub chunks: Vec<TranscriptChunk>,
    pub language: Option<String>,
    /// Backend confidence in the detected language, in `[0, 1]`.
    pub language_probability: Option<f64>,
}

/// A time-bounded span of transcript text, offset into its source audio.
///
/// Chunks within one file are non-overlapping and ordered by `start`;
/// the backend guarantees this, the playback synchronizer assumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Start offset in seconds.
    pub start: f64,
    /// End offset in seconds, `>= start`.
    pub end: f64,
    pub text: String,
}
