use std::sync::Arc;

use bson::oid::ObjectId;
use thiserror::Error;
use tracing::info;

use clinscribe_db::models::Patient;

use crate::dao::base::DaoError;
use crate::store::PatientStore;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Patient not found")]
    PatientNotFound,
    #[error("No patient context: select a patient or provide a patient name")]
    NoPatientContext,
    #[error(transparent)]
    Store(#[from] DaoError),
}

/// Everything known about which patient an encounter belongs to. Built
/// once per pipeline run from caller metadata plus transcription output;
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub explicit_patient_id: Option<ObjectId>,
    /// Name supplied by the caller or extracted by the backend, already
    /// filtered to non-blank.
    pub extracted_name: Option<String>,
    pub raw_audio_count: usize,
}

#[derive(Debug, Clone)]
pub struct ResolvedPatient {
    pub patient: Patient,
    /// Informational only: downstream uses this for user messaging,
    /// never for control flow.
    pub was_created: bool,
}

/// Resolves the subject patient for an encounter, in strict order:
/// explicit id (owner-scoped), then name match, then lazy creation.
pub struct PatientResolver {
    patients: Arc<dyn PatientStore>,
}

impl PatientResolver {
    pub fn new(patients: Arc<dyn PatientStore>) -> Self {
        Self { patients }
    }

    pub async fn resolve(
        &self,
        clinician_id: ObjectId,
        ctx: &ResolutionContext,
    ) -> Result<ResolvedPatient, ResolveError> {
        // 1. Explicit id wins over any extracted name, and must belong to
        //    this clinician.
        if let Some(patient_id) = ctx.explicit_patient_id {
            return match self.patients.find_by_id(clinician_id, patient_id).await? {
                Some(patient) => Ok(ResolvedPatient {
                    patient,
                    was_created: false,
                }),
                None => Err(ResolveError::PatientNotFound),
            };
        }

        let Some(name) = ctx.extracted_name.as_deref() else {
            return Err(ResolveError::NoPatientContext);
        };

        // 2. Substring match against existing patients.
        if let Some(patient) = self
            .patients
            .find_by_name_contains(clinician_id, name)
            .await?
        {
            info!(patient = %patient.name, "Matched extracted name to existing patient");
            return Ok(ResolvedPatient {
                patient,
                was_created: false,
            });
        }

        // 3. No match: create the patient with just the name.
        let patient = self.patients.create(clinician_id, name).await?;
        info!(patient = %patient.name, "Created patient from extracted name");
        Ok(ResolvedPatient {
            patient,
            was_created: true,
        })
    }
}
