use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("No audio files provided")]
    NoAudioProvided,
}

/// How an audio blob entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Recorded,
    Uploaded,
}

/// A raw audio blob as submitted by the caller, before normalization.
#[derive(Debug, Clone)]
pub struct RawAudio {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub source_kind: SourceKind,
    /// Client-measured duration in seconds, when known.
    pub duration_hint: Option<f64>,
}

impl RawAudio {
    /// An in-browser recording arrives as an anonymous blob: no filename,
    /// kind `Recorded`. Uploads keep their original name.
    pub fn recorded(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: None,
            mime_type: None,
            source_kind: SourceKind::Recorded,
            duration_hint: None,
        }
    }

    pub fn uploaded(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: Some(file_name.into()),
            mime_type: None,
            source_kind: SourceKind::Uploaded,
            duration_hint: None,
        }
    }
}

/// A normalized audio input, ready for the gateway. Owned by the pipeline
/// invocation that created it and discarded once the gateway call settles.
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub id: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub display_name: String,
    pub source_kind: SourceKind,
    pub duration_hint: Option<f64>,
}

/// Optional caller-supplied metadata accompanying an encounter submission.
#[derive(Debug, Clone, Default)]
pub struct EncounterMeta {
    pub patient_name: Option<String>,
    pub encounter_title: Option<String>,
}

const FALLBACK_MIME: &str = "audio/webm";

/// Validates and normalizes a submission's audio blobs.
///
/// Fails with [`IntakeError::NoAudioProvided`] on an empty set. Blobs
/// without a filename get `recording_<index+1>`, blobs without a MIME type
/// fall back to `audio/webm`. Pure transform, no side effects.
pub fn normalize(raw: Vec<RawAudio>) -> Result<Vec<AudioInput>, IntakeError> {
    if raw.is_empty() {
        return Err(IntakeError::NoAudioProvided);
    }

    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(index, blob)| AudioInput {
            id: Uuid::new_v4().to_string(),
            bytes: blob.bytes,
            mime_type: blob
                .mime_type
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_MIME.to_string()),
            display_name: blob
                .file_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("recording_{}", index + 1)),
            source_kind: blob.source_kind,
            duration_hint: blob.duration_hint,
        })
        .collect())
}

/// Sums the duration hints across inputs; `None` when no input carried one.
pub fn total_duration_hint(inputs: &[AudioInput]) -> Option<f64> {
    let hints: Vec<f64> = inputs.iter().filter_map(|i| i.duration_hint).collect();
    if hints.is_empty() {
        None
    } else {
        Some(hints.iter().sum())
    }
}
