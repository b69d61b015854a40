use bson::{Bson, DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// One recorded and transcribed clinical visit, tied to one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub clinician_id: ObjectId,
    pub patient_id: ObjectId,
    pub title: String,
    pub raw_transcript: String,
    /// Structured note as produced by the structuring step. Stored opaque;
    /// the canonical field set lives in the transcription crate.
    pub structured_note: Bson,
    pub status: EncounterStatus,
    pub duration_secs: Option<f64>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

impl Encounter {
    pub const COLLECTION: &'static str = "encounters";
}

/// Pipeline-created encounters start as `Draft`; only the manual save path
/// writes `Final`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EncounterStatus {
    Draft,
    Final,
}
