use bson::{DateTime, doc, oid::ObjectId};
use clinscribe_db::models::Patient;
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct PatientDao {
    pub base: BaseDao<Patient>,
}

impl PatientDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Patient::COLLECTION),
        }
    }

    pub async fn create(&self, clinician_id: ObjectId, name: String) -> DaoResult<Patient> {
        if name.trim().is_empty() {
            return Err(DaoError::Validation("Patient name is required".to_string()));
        }

        let now = DateTime::now();
        let patient = Patient {
            id: None,
            clinician_id,
            name,
            date_of_birth: None,
            gender: None,
            contact: None,
            medical_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let id = self.base.insert_one(&patient).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_for_clinician(
        &self,
        clinician_id: ObjectId,
        patient_id: ObjectId,
    ) -> DaoResult<Patient> {
        self.base
            .find_by_id_for_clinician(clinician_id, patient_id)
            .await
    }

    /// Case-insensitive "contains" match on name, scoped to the clinician.
    /// Contains rather than exact because names extracted from transcripts
    /// are noisy ("Jane Roe" vs "Ms. Jane Roe"). First match wins.
    pub async fn find_by_name_contains(
        &self,
        clinician_id: ObjectId,
        fragment: &str,
    ) -> DaoResult<Option<Patient>> {
        self.base
            .find_one(doc! {
                "clinician_id": clinician_id,
                "name": { "$regex": escape_regex(fragment), "$options": "i" },
                "deleted_at": null,
            })
            .await
    }
}

/// Escapes regex metacharacters so the fragment matches literally.
fn escape_regex(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
