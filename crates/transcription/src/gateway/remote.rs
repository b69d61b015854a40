use std::error::Error as _;
use std::io::ErrorKind;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{GatewayError, StructuringResult, TranscribeResponse, TranscriptionBackend};
use crate::config::GatewayConfig;
use crate::intake::{AudioInput, EncounterMeta};

/// HTTP client for the external transcription + structuring service.
///
/// Sends the whole audio set as one multipart POST and races the call
/// against the configured ceiling and the caller's cancellation token;
/// whichever settles first decides the outcome.
pub struct RemoteGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl RemoteGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/transcribe-multiple",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_form(inputs: Vec<AudioInput>, meta: &EncounterMeta) -> Result<Form, GatewayError> {
        let mut form = Form::new();
        for input in inputs {
            let part = Part::bytes(input.bytes)
                .file_name(input.display_name)
                .mime_str(&input.mime_type)
                .map_err(GatewayError::Transport)?;
            form = form.part("audio_files", part);
        }
        if let Some(name) = &meta.patient_name {
            form = form.text("patient_name", name.clone());
        }
        if let Some(title) = &meta.encounter_title {
            form = form.text("encounter_title", title.clone());
        }
        Ok(form)
    }
}

#[async_trait]
impl TranscriptionBackend for RemoteGateway {
    async fn transcribe(
        &self,
        inputs: Vec<AudioInput>,
        meta: &EncounterMeta,
        cancel: CancellationToken,
    ) -> Result<StructuringResult, GatewayError> {
        let ceiling = self.config.ceiling;
        let ceiling_secs = ceiling.as_secs();
        let url = self.endpoint();
        let file_count = inputs.len();
        let form = Self::build_form(inputs, meta)?;

        info!(files = file_count, %url, "Submitting encounter audio for transcription");
        let started = Instant::now();

        let send = self.client.post(&url).multipart(form).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            outcome = tokio::time::timeout(ceiling, send) => match outcome {
                Err(_) => return Err(GatewayError::Timeout(ceiling_secs)),
                Ok(Err(e)) => return Err(classify_send_error(e)),
                Ok(Ok(response)) => response,
            },
        };

        let status = response.status();

        // The remote can also stall or drop mid-body; keep racing the same
        // ceiling while draining the response.
        let remaining = ceiling.saturating_sub(started.elapsed());
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            read = tokio::time::timeout(remaining, response.text()) => match read {
                Err(_) => return Err(GatewayError::Timeout(ceiling_secs)),
                Ok(Err(e)) => {
                    // A status line arrived, then transport failed: the
                    // backend likely finished processing and the reply was
                    // lost.
                    warn!(error = %e, "Connection lost while reading transcription response");
                    return Err(GatewayError::ConnectionLost);
                }
                Ok(Ok(body)) => body,
            },
        };

        if !status.is_success() {
            return Err(GatewayError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let wire: TranscribeResponse =
            serde_json::from_str(&body).map_err(GatewayError::MalformedResponse)?;
        let result = wire.into_result();

        info!(
            files = file_count,
            transcript_chars = result.combined_transcript.len(),
            recovered = result.structuring_recovered,
            elapsed_secs = started.elapsed().as_secs(),
            "Transcription completed"
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        "remote_gateway"
    }
}

fn classify_send_error(e: reqwest::Error) -> GatewayError {
    if is_mid_message_close(&e) {
        warn!(error = %e, "Connection closed before a transcription response arrived");
        GatewayError::ConnectionLost
    } else {
        GatewayError::Transport(e)
    }
}

/// Walks the error chain looking for evidence the socket closed mid-message
/// rather than the request failing outright (refused, DNS, TLS).
fn is_mid_message_close(e: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        let text = err.to_string();
        if text.contains("connection closed")
            || text.contains("connection reset")
            || text.contains("IncompleteMessage")
        {
            return true;
        }
        source = err.source();
    }
    false
}
