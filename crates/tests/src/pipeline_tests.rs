use std::sync::Arc;
use std::time::Duration;

use bson::oid::ObjectId;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use clinscribe_db::models::EncounterStatus;
use clinscribe_services::pipeline::{EncounterPipeline, EncounterSubmission, PipelineError};
use clinscribe_services::resolver::ResolveError;
use clinscribe_services::store::{EncounterStore, PatientStore};
use clinscribe_transcription::config::GatewayConfig;
use clinscribe_transcription::gateway::{GatewayError, RemoteGateway, TranscriptionBackend};
use clinscribe_transcription::intake::{IntakeError, RawAudio};
use clinscribe_transcription::note::MANUAL_REVIEW;

use crate::fixtures::memory_store::{MemoryEncounterStore, MemoryPatientStore};
use crate::fixtures::stub_backend::{
    StubBackend, StubResponse, sample_backend_json, sample_result, spawn_backend,
};

struct Harness {
    patients: Arc<MemoryPatientStore>,
    encounters: Arc<MemoryEncounterStore>,
    pipeline: EncounterPipeline,
}

fn harness(backend: Arc<dyn TranscriptionBackend>) -> Harness {
    let patients = Arc::new(MemoryPatientStore::default());
    let encounters = Arc::new(MemoryEncounterStore::default());
    let pipeline = EncounterPipeline::new(
        backend,
        Arc::clone(&patients) as Arc<dyn PatientStore>,
        Arc::clone(&encounters) as Arc<dyn EncounterStore>,
    );
    Harness {
        patients,
        encounters,
        pipeline,
    }
}

fn submission(clinician_id: ObjectId, files: usize) -> EncounterSubmission {
    EncounterSubmission {
        clinician_id,
        audio: (0..files)
            .map(|_| RawAudio::recorded(vec![0u8; 32]))
            .collect(),
        patient_id: None,
        patient_name: None,
        encounter_title: None,
    }
}

#[tokio::test]
async fn empty_audio_fails_before_any_backend_call() {
    let backend = StubBackend::succeeding(sample_result(Some("Jane Roe"), None));
    let h = harness(backend.clone());

    let err = h
        .pipeline
        .process(
            submission(ObjectId::new(), 0),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Intake(IntakeError::NoAudioProvided)
    ));
    assert_eq!(backend.call_count(), 0);
    assert_eq!(h.encounters.count(), 0);
}

#[tokio::test]
async fn explicit_id_not_owned_by_caller_fails_even_with_a_name() {
    let backend = StubBackend::succeeding(sample_result(Some("Jane Roe"), None));
    let h = harness(backend.clone());

    let other_clinician = ObjectId::new();
    let foreign_patient = h.patients.seed(other_clinician, "Jane Roe");

    let mut sub = submission(ObjectId::new(), 1);
    sub.patient_id = Some(foreign_patient);

    let err = h
        .pipeline
        .process(sub, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Resolve(ResolveError::PatientNotFound)
    ));
    assert_eq!(h.encounters.count(), 0);
    assert_eq!(h.patients.all().len(), 1);
}

#[tokio::test]
async fn explicit_id_resolves_to_the_owned_patient() {
    let backend = StubBackend::succeeding(sample_result(Some("Somebody Else"), None));
    let h = harness(backend);

    let clinician = ObjectId::new();
    let patient_id = h.patients.seed(clinician, "John Dough");

    let mut sub = submission(clinician, 1);
    sub.patient_id = Some(patient_id);

    let outcome = h
        .pipeline
        .process(sub, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.patient_id, patient_id);
    assert_eq!(outcome.patient_name, "John Dough");
    assert!(!outcome.created_patient);
    assert_eq!(h.encounters.count(), 1);
}

#[tokio::test]
async fn extracted_name_reuses_an_existing_patient_by_substring() {
    let backend = StubBackend::succeeding(sample_result(Some("jane"), None));
    let h = harness(backend);

    let clinician = ObjectId::new();
    let existing = h.patients.seed(clinician, "Jane Roe");

    let outcome = h
        .pipeline
        .process(submission(clinician, 1), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.patient_id, existing);
    assert!(!outcome.created_patient);
    assert_eq!(h.patients.all().len(), 1);
}

#[tokio::test]
async fn unmatched_name_creates_exactly_one_patient() {
    let backend = StubBackend::succeeding(sample_result(Some("Jane Roe"), None));
    let h = harness(backend);
    let clinician = ObjectId::new();

    let outcome = h
        .pipeline
        .process(submission(clinician, 1), CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.created_patient);
    assert_eq!(outcome.patient_name, "Jane Roe");
    assert_eq!(h.patients.all().len(), 1);
    assert_eq!(h.patients.create_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeat_submission_reuses_the_lazily_created_patient() {
    let backend = StubBackend::succeeding(sample_result(Some("Jane Roe"), None));
    let h = harness(backend);
    let clinician = ObjectId::new();

    let first = h
        .pipeline
        .process(submission(clinician, 1), CancellationToken::new())
        .await
        .unwrap();

    // Sequentially, the second run matches the patient the first one
    // created. Only near-simultaneous runs race past each other and
    // duplicate (see the resolver tests).
    let second = h
        .pipeline
        .process(submission(clinician, 1), CancellationToken::new())
        .await
        .unwrap();

    assert!(first.created_patient);
    assert!(!second.created_patient);
    assert_eq!(second.patient_id, first.patient_id);
    assert_eq!(h.patients.all().len(), 1);
    assert_eq!(h.encounters.count(), 2);
}

#[tokio::test]
async fn no_id_and_no_name_fails_with_no_patient_context() {
    let backend = StubBackend::succeeding(sample_result(None, None));
    let h = harness(backend);

    let err = h
        .pipeline
        .process(submission(ObjectId::new(), 1), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Resolve(ResolveError::NoPatientContext)
    ));
    assert_eq!(h.encounters.count(), 0);
}

#[tokio::test]
async fn gateway_timeout_skips_resolution_and_persistence() {
    let backend = StubBackend::timing_out();
    let h = harness(backend.clone());

    let err = h
        .pipeline
        .process(submission(ObjectId::new(), 2), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Gateway(GatewayError::Timeout(_))
    ));
    assert_eq!(backend.call_count(), 1);
    assert_eq!(h.patients.all().len(), 0);
    assert_eq!(h.encounters.count(), 0);
}

#[tokio::test]
async fn caller_supplied_name_takes_precedence_over_extraction() {
    let backend = StubBackend::succeeding(sample_result(Some("Jane Roe"), None));
    let h = harness(backend);

    let mut sub = submission(ObjectId::new(), 1);
    sub.patient_name = Some("Mary Major".to_string());

    let outcome = h
        .pipeline
        .process(sub, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.patient_name, "Mary Major");
    assert!(outcome.created_patient);
}

#[tokio::test]
async fn title_priority_is_supplied_then_suggested_then_default() {
    let clinician = ObjectId::new();

    // Supplied wins over suggested.
    let h = harness(StubBackend::succeeding(sample_result(
        Some("Jane Roe"),
        Some("Suggested title"),
    )));
    let mut sub = submission(clinician, 1);
    sub.encounter_title = Some("Supplied title".to_string());
    let outcome = h.pipeline.process(sub, CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.encounter_title, "Supplied title");

    // Suggested when nothing is supplied.
    let h = harness(StubBackend::succeeding(sample_result(
        Some("Jane Roe"),
        Some("Suggested title"),
    )));
    let outcome = h
        .pipeline
        .process(submission(clinician, 1), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.encounter_title, "Suggested title");

    // Fixed fallback otherwise.
    let h = harness(StubBackend::succeeding(sample_result(Some("Jane Roe"), None)));
    let outcome = h
        .pipeline
        .process(submission(clinician, 1), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.encounter_title, "Clinical Note");
}

#[tokio::test]
async fn persisted_encounter_is_a_draft_with_the_raw_transcript() {
    let backend = StubBackend::succeeding(sample_result(Some("Jane Roe"), None));
    let h = harness(backend);

    let outcome = h
        .pipeline
        .process(submission(ObjectId::new(), 1), CancellationToken::new())
        .await
        .unwrap();

    let encounters = h.encounters.all();
    assert_eq!(encounters.len(), 1);
    let encounter = &encounters[0];
    assert_eq!(encounter.id, Some(outcome.encounter_id));
    assert_eq!(encounter.patient_id, outcome.patient_id);
    assert_eq!(encounter.status, EncounterStatus::Draft);
    assert_eq!(encounter.raw_transcript, outcome.transcript);
    assert!(!encounter.raw_transcript.is_empty());
}

#[tokio::test]
async fn three_uploads_without_context_create_jane_roe_and_one_draft() {
    let backend = StubBackend::succeeding(sample_result(Some("Jane Roe"), None));
    let h = harness(backend);
    let clinician = ObjectId::new();

    let sub = EncounterSubmission {
        clinician_id: clinician,
        audio: vec![
            RawAudio::uploaded(vec![1u8; 16], "visit_a.m4a"),
            RawAudio::uploaded(vec![2u8; 16], "visit_b.m4a"),
            RawAudio::uploaded(vec![3u8; 16], "visit_c.m4a"),
        ],
        patient_id: None,
        patient_name: None,
        encounter_title: None,
    };

    let outcome = h.pipeline.process(sub, CancellationToken::new()).await.unwrap();

    assert!(outcome.created_patient);
    assert_eq!(outcome.patient_name, "Jane Roe");

    let patients = h.patients.all();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0].name, "Jane Roe");
    assert_eq!(patients[0].clinician_id, clinician);

    let encounters = h.encounters.all();
    assert_eq!(encounters.len(), 1);
    assert_eq!(encounters[0].status, EncounterStatus::Draft);
    assert_eq!(encounters[0].patient_id, outcome.patient_id);
}

#[tokio::test]
async fn malformed_structuring_still_persists_transcript_with_fallback_note() {
    // End to end through the real HTTP gateway: the backend returns a
    // transcript but garbage in place of the structured note.
    let (base_url, _) = spawn_backend(StubResponse::Json(json!({
        "combined_transcript": "Patient reports intermittent chest pain.",
        "structured_note": { "soap": "not the expected shape" },
        "transcripts": [],
        "patient_name": "Jane Roe",
    })))
    .await;
    let gateway = Arc::new(RemoteGateway::new(GatewayConfig::new(
        base_url,
        Duration::from_secs(5),
    )));
    let h = harness(gateway);

    let outcome = h
        .pipeline
        .process(submission(ObjectId::new(), 1), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.transcript, "Patient reports intermittent chest pain.");
    assert!(outcome.structured_note.is_manual_review());

    let encounters = h.encounters.all();
    assert_eq!(encounters.len(), 1);
    assert!(!encounters[0].raw_transcript.is_empty());
    let note: Value = encounters[0].structured_note.clone().into();
    assert_eq!(note["chief_complaint"], MANUAL_REVIEW);
    assert_eq!(note["plan"], MANUAL_REVIEW);
}

#[tokio::test]
async fn full_flow_against_the_http_stub_backend() {
    let (base_url, received) = spawn_backend(StubResponse::Json(sample_backend_json(
        Some("Jane Roe"),
        Some("Morning visit"),
    )))
    .await;
    let gateway = Arc::new(RemoteGateway::new(GatewayConfig::new(
        base_url,
        Duration::from_secs(5),
    )));
    let h = harness(gateway);

    let outcome = h
        .pipeline
        .process(submission(ObjectId::new(), 2), CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.created_patient);
    assert_eq!(outcome.patient_name, "Jane Roe");
    assert_eq!(outcome.encounter_title, "Morning visit");
    assert_eq!(outcome.transcripts.len(), 1);
    assert_eq!(h.encounters.count(), 1);
    assert_eq!(received.lock().unwrap()[0].audio_parts, 2);
}
