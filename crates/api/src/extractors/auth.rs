use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use bson::oid::ObjectId;

use clinscribe_services::auth::{self, AuthError};

use crate::{error::ApiError, state::AppState};

/// The authenticated clinician, extracted from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: ObjectId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingToken)?;

        let claims = auth::verify_token(token, &state.settings.auth.jwt_secret)?;
        Ok(AuthUser {
            user_id: claims.clinician_id()?,
        })
    }
}
