use bson::{Bson, DateTime, oid::ObjectId};
use clinscribe_db::models::{Encounter, EncounterStatus};
use mongodb::Database;

use super::base::{BaseDao, DaoResult};

/// Fields for a new encounter record, status chosen by the caller: the
/// pipeline writes `Draft`, the manual save path writes `Final`.
pub struct NewEncounter {
    pub title: String,
    pub raw_transcript: String,
    pub structured_note: Bson,
    pub status: EncounterStatus,
    pub duration_secs: Option<f64>,
}

pub struct EncounterDao {
    pub base: BaseDao<Encounter>,
}

impl EncounterDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Encounter::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        clinician_id: ObjectId,
        patient_id: ObjectId,
        new: NewEncounter,
    ) -> DaoResult<Encounter> {
        let now = DateTime::now();
        let encounter = Encounter {
            id: None,
            clinician_id,
            patient_id,
            title: new.title,
            raw_transcript: new.raw_transcript,
            structured_note: new.structured_note,
            status: new.status,
            duration_secs: new.duration_secs,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let id = self.base.insert_one(&encounter).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_for_clinician(
        &self,
        clinician_id: ObjectId,
        encounter_id: ObjectId,
    ) -> DaoResult<Encounter> {
        self.base
            .find_by_id_for_clinician(clinician_id, encounter_id)
            .await
    }
}
