use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A patient record, owned by exactly one clinician.
///
/// Patients are created either explicitly through the product's intake
/// forms or lazily by the encounter pipeline when a transcript names a
/// patient no existing record matches. Name is intentionally not unique
/// per clinician; repeated lazy creation can produce duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub clinician_id: ObjectId,
    pub name: String,
    pub date_of_birth: Option<DateTime>,
    pub gender: Option<String>,
    pub contact: Option<String>,
    pub medical_id: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

impl Patient {
    pub const COLLECTION: &'static str = "patients";
}
