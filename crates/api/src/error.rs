use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use clinscribe_services::auth::AuthError;
use clinscribe_services::dao::base::DaoError;
use clinscribe_services::pipeline::PipelineError;
use clinscribe_services::resolver::ResolveError;
use clinscribe_transcription::gateway::GatewayError;

const RETRY_SMALLER_SUGGESTION: &str =
    "Try processing fewer files at once or shorter audio files";
const VERIFY_FIRST_SUGGESTION: &str =
    "Do not retry immediately; the backend may have completed the work; check its logs first";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
    Validation(String),
    /// The transcription ceiling was reached; retrying with less audio can
    /// succeed.
    Timeout { message: String, suggestion: String },
    /// The transport dropped mid-response; the backend likely finished, so
    /// blind retries waste completed work.
    ConnectionLost { message: String, suggestion: String },
    /// The transcription backend answered with an error; its body is
    /// attached verbatim for diagnostics.
    UpstreamError { status: u16, body: String },
    UpstreamUnreachable(String),
    Cancelled,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::Internal(msg) => write!(f, "Internal error: {msg}"),
            ApiError::Validation(msg) => write!(f, "Validation: {msg}"),
            ApiError::Timeout { message, .. } => write!(f, "Timeout: {message}"),
            ApiError::ConnectionLost { message, .. } => write!(f, "Connection lost: {message}"),
            ApiError::UpstreamError { status, body } => {
                write!(f, "Transcription backend returned {status}: {body}")
            }
            ApiError::UpstreamUnreachable(msg) => {
                write!(f, "Transcription backend unreachable: {msg}")
            }
            ApiError::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, suggestion) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg, None),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation", msg, None),
            ApiError::Timeout {
                message,
                suggestion,
            } => (
                StatusCode::REQUEST_TIMEOUT,
                "transcription_timeout",
                message,
                Some(suggestion),
            ),
            ApiError::ConnectionLost {
                message,
                suggestion,
            } => (
                StatusCode::REQUEST_TIMEOUT,
                "connection_lost",
                message,
                Some(suggestion),
            ),
            ApiError::UpstreamError { status, body } => (
                StatusCode::BAD_GATEWAY,
                "transcription_backend",
                format!("Backend returned {status}: {body}"),
                None,
            ),
            ApiError::UpstreamUnreachable(msg) => (
                StatusCode::BAD_GATEWAY,
                "transcription_unreachable",
                msg,
                None,
            ),
            ApiError::Cancelled => (
                // 499: client closed the request before the pipeline settled
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                "cancelled",
                "Request cancelled before transcription completed".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            suggestion,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            DaoError::DuplicateKey(msg) => ApiError::BadRequest(msg),
            DaoError::Forbidden(msg) => ApiError::Unauthorized(msg),
            DaoError::Validation(msg) => ApiError::Validation(msg),
            DaoError::Mongo(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonSer(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonDe(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => {
                ApiError::Unauthorized("Missing bearer token".to_string())
            }
            AuthError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Timeout(secs) => ApiError::Timeout {
                message: format!(
                    "Transcription request timed out after {} minutes",
                    secs.div_ceil(60)
                ),
                suggestion: RETRY_SMALLER_SUGGESTION.to_string(),
            },
            GatewayError::ConnectionLost => ApiError::ConnectionLost {
                message: "Connection closed during transcription; the backend likely completed \
                          processing but the response was lost"
                    .to_string(),
                suggestion: VERIFY_FIRST_SUGGESTION.to_string(),
            },
            GatewayError::Cancelled => ApiError::Cancelled,
            GatewayError::Backend { status, body } => ApiError::UpstreamError { status, body },
            GatewayError::MalformedResponse(e) => {
                ApiError::Internal(format!("Unparseable transcription response: {e}"))
            }
            GatewayError::Transport(e) => ApiError::UpstreamUnreachable(e.to_string()),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::PatientNotFound => ApiError::NotFound("Patient not found".to_string()),
            ResolveError::NoPatientContext => ApiError::BadRequest(
                "No patient context: select a patient or provide a patient name".to_string(),
            ),
            ResolveError::Store(e) => e.into(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Intake(e) => ApiError::BadRequest(e.to_string()),
            PipelineError::Gateway(e) => e.into(),
            PipelineError::Resolve(e) => e.into(),
            PipelineError::Persistence(e) => e.into(),
        }
    }
}
