use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use validator::Validate;

use clinscribe_db::models::{Encounter, EncounterStatus};
use clinscribe_services::dao::base::DaoError;
use clinscribe_services::dao::encounter::NewEncounter;
use clinscribe_services::pipeline::{EncounterOutcome, EncounterSubmission};
use clinscribe_transcription::intake::{RawAudio, SourceKind};
use clinscribe_transcription::{StructuredNote, TranscriptFile};

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct ProcessEncounterResponse {
    pub transcript: String,
    pub structured_note: StructuredNote,
    pub transcripts: Vec<TranscriptFile>,
    pub encounter_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub encounter_title: String,
    pub created_patient: bool,
}

impl From<EncounterOutcome> for ProcessEncounterResponse {
    fn from(outcome: EncounterOutcome) -> Self {
        Self {
            transcript: outcome.transcript,
            structured_note: outcome.structured_note,
            transcripts: outcome.transcripts,
            encounter_id: outcome.encounter_id.to_hex(),
            patient_id: outcome.patient_id.to_hex(),
            patient_name: outcome.patient_name,
            encounter_title: outcome.encounter_title,
            created_patient: outcome.created_patient,
        }
    }
}

/// Accepts an encounter submission as multipart form data: repeated
/// `audio_files` parts plus optional `patient_id`, `patient_name` and
/// `encounter_title` text fields, then runs the ingestion pipeline.
pub async fn process(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ProcessEncounterResponse>, ApiError> {
    let mut audio: Vec<RawAudio> = Vec::new();
    let mut patient_id: Option<String> = None;
    let mut patient_name: Option<String> = None;
    let mut encounter_title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio_files" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let mime_type = field.content_type().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read audio part: {e}")))?;
                // In-browser recordings arrive as anonymous blobs; uploads
                // keep their filename.
                let source_kind = if file_name.is_some() {
                    SourceKind::Uploaded
                } else {
                    SourceKind::Recorded
                };
                audio.push(RawAudio {
                    bytes: bytes.to_vec(),
                    file_name,
                    mime_type,
                    source_kind,
                    duration_hint: None,
                });
            }
            "patient_id" => patient_id = Some(read_text(field).await?),
            "patient_name" => patient_name = Some(read_text(field).await?),
            "encounter_title" => encounter_title = Some(read_text(field).await?),
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let patient_id = patient_id
        .filter(|s| !s.trim().is_empty())
        .map(|s| ObjectId::parse_str(&s))
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid patient_id".to_string()))?;

    let submission = EncounterSubmission {
        clinician_id: auth.user_id,
        audio,
        patient_id,
        patient_name,
        encounter_title,
    };

    // Dropped when the client goes away; programmatic callers can cancel.
    let cancel = CancellationToken::new();
    let outcome = state.pipeline.process(submission, cancel).await?;

    Ok(Json(outcome.into()))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart field: {e}")))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveEncounterRequest {
    pub patient_id: String,
    #[validate(length(min = 1, message = "Transcript must not be empty"))]
    pub transcript: String,
    pub structured_note: Value,
    pub title: Option<String>,
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct EncounterResponse {
    pub id: String,
    pub patient_id: String,
    pub title: String,
    pub status: EncounterStatus,
    pub raw_transcript: String,
    pub structured_note: Value,
    pub duration_secs: Option<f64>,
    pub created_at: String,
}

impl From<Encounter> for EncounterResponse {
    fn from(encounter: Encounter) -> Self {
        Self {
            id: encounter.id.map(|id| id.to_hex()).unwrap_or_default(),
            patient_id: encounter.patient_id.to_hex(),
            title: encounter.title,
            status: encounter.status,
            raw_transcript: encounter.raw_transcript,
            structured_note: encounter.structured_note.into(),
            duration_secs: encounter.duration_secs,
            created_at: encounter
                .created_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
        }
    }
}

/// The manual save path: a reviewed note is persisted as `FINAL`, against
/// a patient that must already exist and belong to the clinician.
pub async fn save(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SaveEncounterRequest>,
) -> Result<Json<EncounterResponse>, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let patient_id = ObjectId::parse_str(&body.patient_id)
        .map_err(|_| ApiError::BadRequest("Invalid patient_id".to_string()))?;

    let patient = state
        .patients
        .find_for_clinician(auth.user_id, patient_id)
        .await
        .map_err(|e| match e {
            DaoError::NotFound => ApiError::NotFound("Patient not found".to_string()),
            other => other.into(),
        })?;

    let structured_note =
        bson::to_bson(&body.structured_note).map_err(|e| ApiError::Internal(e.to_string()))?;
    let title = body
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Clinical Note".to_string());

    let encounter = state
        .encounters
        .create(
            auth.user_id,
            patient.id.unwrap_or(patient_id),
            NewEncounter {
                title,
                raw_transcript: body.transcript,
                structured_note,
                status: EncounterStatus::Final,
                duration_secs: body.duration_secs,
            },
        )
        .await?;

    Ok(Json(encounter.into()))
}

/// Owner-scoped fetch of one persisted encounter.
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(encounter_id): Path<String>,
) -> Result<Json<EncounterResponse>, ApiError> {
    let eid = ObjectId::parse_str(&encounter_id)
        .map_err(|_| ApiError::BadRequest("Invalid encounter_id".to_string()))?;

    let encounter = state.encounters.find_for_clinician(auth.user_id, eid).await?;

    Ok(Json(encounter.into()))
}
