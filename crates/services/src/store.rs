use async_trait::async_trait;
use bson::oid::ObjectId;
use clinscribe_db::models::{Encounter, EncounterStatus, Patient};
use clinscribe_transcription::StructuredNote;

use crate::dao::base::DaoResult;
use crate::dao::encounter::{EncounterDao, NewEncounter};
use crate::dao::patient::PatientDao;

/// The narrow persistence contract the pipeline depends on. Every lookup
/// is scoped to the owning clinician. Implemented by the Mongo DAOs in
/// production and by in-memory stores in tests.
#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn find_by_id(
        &self,
        clinician_id: ObjectId,
        patient_id: ObjectId,
    ) -> DaoResult<Option<Patient>>;

    /// Case-insensitive substring match on patient name; first match wins.
    async fn find_by_name_contains(
        &self,
        clinician_id: ObjectId,
        fragment: &str,
    ) -> DaoResult<Option<Patient>>;

    /// Creates a patient with just a name. No dedup: two calls with the
    /// same name create two patients.
    async fn create(&self, clinician_id: ObjectId, name: &str) -> DaoResult<Patient>;
}

/// Draft-encounter fields the pipeline persists.
#[derive(Debug, Clone)]
pub struct EncounterDraft {
    pub title: String,
    pub raw_transcript: String,
    pub structured_note: StructuredNote,
    pub duration_secs: Option<f64>,
}

#[async_trait]
pub trait EncounterStore: Send + Sync {
    async fn create_draft(
        &self,
        clinician_id: ObjectId,
        patient_id: ObjectId,
        draft: EncounterDraft,
    ) -> DaoResult<Encounter>;
}

#[async_trait]
impl PatientStore for PatientDao {
    async fn find_by_id(
        &self,
        clinician_id: ObjectId,
        patient_id: ObjectId,
    ) -> DaoResult<Option<Patient>> {
        self.base
            .find_one(bson::doc! {
                "_id": patient_id,
                "clinician_id": clinician_id,
                "deleted_at": null,
            })
            .await
    }

    async fn find_by_name_contains(
        &self,
        clinician_id: ObjectId,
        fragment: &str,
    ) -> DaoResult<Option<Patient>> {
        PatientDao::find_by_name_contains(self, clinician_id, fragment).await
    }

    async fn create(&self, clinician_id: ObjectId, name: &str) -> DaoResult<Patient> {
        PatientDao::create(self, clinician_id, name.to_string()).await
    }
}

#[async_trait]
impl EncounterStore for EncounterDao {
    async fn create_draft(
        &self,
        clinician_id: ObjectId,
        patient_id: ObjectId,
        draft: EncounterDraft,
    ) -> DaoResult<Encounter> {
        let structured_note = bson::to_bson(&draft.structured_note)?;
        EncounterDao::create(
            self,
            clinician_id,
            patient_id,
            NewEncounter {
                title: draft.title,
                raw_transcript: draft.raw_transcript,
                structured_note,
                status: EncounterStatus::Draft,
                duration_secs: draft.duration_secs,
            },
        )
        .await
    }
}
