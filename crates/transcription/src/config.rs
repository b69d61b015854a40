use std::time::Duration;

/// Configuration for the remote transcription gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the transcription backend, without a trailing slash.
    pub base_url: String,
    /// Hard wall-clock ceiling for one transcription call. When the ceiling
    /// is reached the in-flight request is aborted and the call fails with
    /// [`GatewayError::Timeout`](crate::GatewayError::Timeout).
    pub ceiling: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>, ceiling: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            ceiling,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            // Multi-file encounters routinely take minutes of backend work.
            ceiling: Duration::from_secs(600),
        }
    }
}
