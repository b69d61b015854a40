pub mod remote;

pub use remote::RemoteGateway;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::TranscriptFile;
use crate::intake::{AudioInput, EncounterMeta};
use crate::note::StructuredNote;

/// Every way a gateway call can fail, classified so callers can give the
/// right remediation. `Timeout` and `ConnectionLost` deliberately stay
/// separate: a timeout is worth retrying with less audio, a lost
/// connection usually means the backend already finished the work.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Transcription request timed out after {0} seconds")]
    Timeout(u64),
    #[error("Transcription request was cancelled by the caller")]
    Cancelled,
    #[error(
        "Connection closed during transcription; the backend likely completed processing but the response was lost"
    )]
    ConnectionLost,
    #[error("Transcription backend returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("Transcription backend returned an unparseable body")]
    MalformedResponse(#[source] serde_json::Error),
    #[error("Transport error talking to the transcription backend")]
    Transport(#[source] reqwest::Error),
}

/// Parsed output of a successful transcription + structuring call.
#[derive(Debug, Clone)]
pub struct StructuringResult {
    pub combined_transcript: String,
    pub transcripts: Vec<TranscriptFile>,
    pub structured_note: StructuredNote,
    /// True when `structured_note` is the manual-review fallback because
    /// the backend's structuring output was missing or malformed.
    pub structuring_recovered: bool,
    pub suggested_patient_name: Option<String>,
    pub suggested_encounter_title: Option<String>,
}

/// Trait for pluggable transcription + structuring backends.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync + 'static {
    /// Transcribes and structures one encounter's audio set.
    ///
    /// Takes the inputs by value: they belong to this invocation and are
    /// dropped once the call settles, success or failure.
    async fn transcribe(
        &self,
        inputs: Vec<AudioInput>,
        meta: &EncounterMeta,
        cancel: CancellationToken,
    ) -> Result<StructuringResult, GatewayError>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}

/// Wire shape of the backend's `/transcribe-multiple` response.
#[derive(Debug, Deserialize)]
pub struct TranscribeResponse {
    #[serde(default)]
    pub combined_transcript: String,
    #[serde(default)]
    pub structured_note: Option<Value>,
    #[serde(default)]
    pub transcripts: Vec<TranscriptFile>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub encounter_title: Option<String>,
}

impl TranscribeResponse {
    /// Converts the wire response, substituting the manual-review fallback
    /// note when structuring produced nothing usable. The transcript is
    /// never discarded on that path.
    pub fn into_result(self) -> StructuringResult {
        let (structured_note, structuring_recovered) =
            match self.structured_note.and_then(StructuredNote::from_value) {
                Some(note) => (note, false),
                None => {
                    warn!("Structuring output missing or malformed, substituting fallback note");
                    (StructuredNote::manual_review(), true)
                }
            };

        StructuringResult {
            combined_transcript: self.combined_transcript,
            transcripts: self.transcripts,
            structured_note,
            structuring_recovered,
            suggested_patient_name: non_blank(self.patient_name),
            suggested_encounter_title: non_blank(self.encounter_title),
        }
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
