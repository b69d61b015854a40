use std::sync::Arc;

use bson::oid::ObjectId;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use clinscribe_transcription::gateway::{GatewayError, TranscriptionBackend};
use clinscribe_transcription::intake::{self, EncounterMeta, IntakeError, RawAudio};
use clinscribe_transcription::{StructuredNote, TranscriptFile};

use crate::dao::base::DaoError;
use crate::resolver::{PatientResolver, ResolutionContext, ResolveError};
use crate::store::{EncounterDraft, EncounterStore, PatientStore};

const DEFAULT_TITLE: &str = "Clinical Note";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Persistence(#[from] DaoError),
}

/// One encounter submission: the audio set plus optional caller metadata,
/// each piece independently optional.
pub struct EncounterSubmission {
    pub clinician_id: ObjectId,
    pub audio: Vec<RawAudio>,
    pub patient_id: Option<ObjectId>,
    pub patient_name: Option<String>,
    pub encounter_title: Option<String>,
}

/// The caller-facing result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct EncounterOutcome {
    pub transcript: String,
    pub structured_note: StructuredNote,
    pub transcripts: Vec<TranscriptFile>,
    pub encounter_id: ObjectId,
    pub patient_id: ObjectId,
    pub patient_name: String,
    pub encounter_title: String,
    /// Informational: whether resolution created a new patient.
    pub created_patient: bool,
}

/// The audio-encounter ingestion pipeline: intake → transcription gateway
/// → patient resolution → encounter write, strictly sequential, no retry.
/// Nothing is persisted until the final step, so a failure anywhere
/// earlier leaves zero state behind.
pub struct EncounterPipeline {
    backend: Arc<dyn TranscriptionBackend>,
    resolver: PatientResolver,
    encounters: Arc<dyn EncounterStore>,
}

impl EncounterPipeline {
    pub fn new(
        backend: Arc<dyn TranscriptionBackend>,
        patients: Arc<dyn PatientStore>,
        encounters: Arc<dyn EncounterStore>,
    ) -> Self {
        Self {
            backend,
            resolver: PatientResolver::new(patients),
            encounters,
        }
    }

    pub async fn process(
        &self,
        submission: EncounterSubmission,
        cancel: CancellationToken,
    ) -> Result<EncounterOutcome, PipelineError> {
        let EncounterSubmission {
            clinician_id,
            audio,
            patient_id,
            patient_name,
            encounter_title,
        } = submission;

        // 1. Intake: validate and normalize before any network call.
        let inputs = intake::normalize(audio)?;
        let raw_audio_count = inputs.len();
        let duration_secs = intake::total_duration_hint(&inputs);
        info!(
            %clinician_id,
            files = raw_audio_count,
            backend = self.backend.name(),
            "Encounter submission accepted"
        );

        // 2. Gateway: the single long-running external call. The inputs
        //    move into it and are gone afterwards.
        let meta = EncounterMeta {
            patient_name: non_blank(patient_name),
            encounter_title: non_blank(encounter_title),
        };
        let result = self.backend.transcribe(inputs, &meta, cancel).await?;

        // 3. Resolution: caller-supplied name takes precedence over the
        //    backend's extraction; blanks count as absent.
        let ctx = ResolutionContext {
            explicit_patient_id: patient_id,
            extracted_name: meta
                .patient_name
                .clone()
                .or_else(|| result.suggested_patient_name.clone()),
            raw_audio_count,
        };
        let resolved = self.resolver.resolve(clinician_id, &ctx).await?;
        let resolved_patient_id = resolved
            .patient
            .id
            .ok_or_else(|| DaoError::Validation("Persisted patient has no id".to_string()))?;

        // 4. The single point of persistence for the whole pipeline.
        let title = meta
            .encounter_title
            .clone()
            .or_else(|| result.suggested_encounter_title.clone())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let encounter = self
            .encounters
            .create_draft(
                clinician_id,
                resolved_patient_id,
                EncounterDraft {
                    title: title.clone(),
                    raw_transcript: result.combined_transcript.clone(),
                    structured_note: result.structured_note.clone(),
                    duration_secs,
                },
            )
            .await?;
        let encounter_id = encounter
            .id
            .ok_or_else(|| DaoError::Validation("Persisted encounter has no id".to_string()))?;

        info!(
            %clinician_id,
            %encounter_id,
            patient_id = %resolved_patient_id,
            created_patient = resolved.was_created,
            recovered_note = result.structuring_recovered,
            "Encounter persisted"
        );

        Ok(EncounterOutcome {
            transcript: result.combined_transcript,
            structured_note: result.structured_note,
            transcripts: result.transcripts,
            encounter_id,
            patient_id: resolved_patient_id,
            patient_name: resolved.patient.name,
            encounter_title: title,
            created_patient: resolved.was_created,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
