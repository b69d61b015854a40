use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use clinscribe_transcription::gateway::{GatewayError, StructuringResult, TranscriptionBackend};
use clinscribe_transcription::intake::{AudioInput, EncounterMeta};
use clinscribe_transcription::note::StructuredNote;

// ── In-process scripted backend ─────────────────────────────────

pub enum StubScript {
    Succeed(StructuringResult),
    Timeout,
}

/// Scripted `TranscriptionBackend` for pipeline logic tests. Counts calls
/// so tests can assert the backend was (or wasn't) reached.
pub struct StubBackend {
    script: StubScript,
    calls: AtomicUsize,
}

impl StubBackend {
    pub fn succeeding(result: StructuringResult) -> Arc<Self> {
        Arc::new(Self {
            script: StubScript::Succeed(result),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn timing_out() -> Arc<Self> {
        Arc::new(Self {
            script: StubScript::Timeout,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionBackend for StubBackend {
    async fn transcribe(
        &self,
        _inputs: Vec<AudioInput>,
        _meta: &EncounterMeta,
        _cancel: CancellationToken,
    ) -> Result<StructuringResult, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            StubScript::Succeed(result) => Ok(result.clone()),
            StubScript::Timeout => Err(GatewayError::Timeout(600)),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

// ── Sample payloads ─────────────────────────────────────────────

pub fn sample_note_json() -> Value {
    json!({
        "chief_complaint": "Persistent cough",
        "history_of_present_illness": "Three days of dry cough, no fever.",
        "physical_exam": "Lungs clear to auscultation.",
        "assessment": "Likely viral upper respiratory infection.",
        "plan": "Supportive care, follow up in one week.",
    })
}

pub fn sample_backend_json(patient_name: Option<&str>, encounter_title: Option<&str>) -> Value {
    json!({
        "combined_transcript": "Good morning, what brings you in today?",
        "structured_note": sample_note_json(),
        "transcripts": [
            {
                "filename": "recording_1",
                "transcript": "Good morning, what brings you in today?",
                "chunks": [
                    { "start": 0.0, "end": 2.4, "text": "Good morning," },
                    { "start": 2.4, "end": 5.1, "text": "what brings you in today?" },
                ],
                "language": "en",
                "language_probability": 0.97,
            },
        ],
        "patient_name": patient_name,
        "encounter_title": encounter_title,
    })
}

pub fn sample_result(
    suggested_name: Option<&str>,
    suggested_title: Option<&str>,
) -> StructuringResult {
    let note = StructuredNote::from_value(sample_note_json()).unwrap();
    StructuringResult {
        combined_transcript: "Good morning, what brings you in today?".to_string(),
        transcripts: Vec::new(),
        structured_note: note,
        structuring_recovered: false,
        suggested_patient_name: suggested_name.map(|s| s.to_string()),
        suggested_encounter_title: suggested_title.map(|s| s.to_string()),
    }
}

// ── HTTP stub server ────────────────────────────────────────────

#[derive(Clone)]
pub enum StubResponse {
    Json(Value),
    Error(u16, String),
    DelayedJson(Duration, Value),
    /// 200 with a non-JSON body.
    RawBody(String),
}

/// What the stub server observed in one multipart request.
#[derive(Debug, Default, Clone)]
pub struct ReceivedForm {
    pub audio_parts: usize,
    pub audio_names: Vec<String>,
    pub patient_name: Option<String>,
    pub encounter_title: Option<String>,
}

struct StubState {
    response: StubResponse,
    received: Arc<Mutex<Vec<ReceivedForm>>>,
}

/// Spawns a stub transcription backend on an ephemeral port. Returns its
/// base URL and the log of received forms.
pub async fn spawn_backend(response: StubResponse) -> (String, Arc<Mutex<Vec<ReceivedForm>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = Arc::new(StubState {
        response,
        received: Arc::clone(&received),
    });

    let app = Router::new()
        .route("/transcribe-multiple", post(handle))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), received)
}

async fn handle(State(state): State<Arc<StubState>>, mut multipart: Multipart) -> Response {
    let mut form = ReceivedForm::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio_files" => {
                form.audio_parts += 1;
                if let Some(file_name) = field.file_name() {
                    form.audio_names.push(file_name.to_string());
                }
                let _ = field.bytes().await;
            }
            "patient_name" => form.patient_name = field.text().await.ok(),
            "encounter_title" => form.encounter_title = field.text().await.ok(),
            _ => {
                let _ = field.bytes().await;
            }
        }
    }
    state.received.lock().unwrap().push(form);

    match &state.response {
        StubResponse::Json(value) => Json(value.clone()).into_response(),
        StubResponse::Error(code, body) => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body.clone(),
        )
            .into_response(),
        StubResponse::DelayedJson(delay, value) => {
            tokio::time::sleep(*delay).await;
            Json(value.clone()).into_response()
        }
        StubResponse::RawBody(body) => body.clone().into_response(),
    }
}

/// Spawns a raw TCP server that reads the request, then replies with a
/// truncated response (status line and headers, but far less body than the
/// advertised content-length) and closes the socket. Exercises the
/// connection-lost-mid-response path.
pub async fn spawn_truncating_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                // Drain the request until the client goes quiet.
                let mut buf = [0u8; 8192];
                loop {
                    match tokio::time::timeout(Duration::from_millis(200), socket.read(&mut buf))
                        .await
                    {
                        Ok(Ok(n)) if n > 0 => continue,
                        _ => break,
                    }
                }

                let response = "HTTP/1.1 200 OK\r\n\
                                content-type: application/json\r\n\
                                content-length: 1000000\r\n\
                                \r\n\
                                {\"combined_transcript\": \"partial";
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}
