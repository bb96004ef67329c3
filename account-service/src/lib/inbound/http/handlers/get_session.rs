use axum::http::StatusCode;
use axum::Extension;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::session::models::SessionPrincipal;

/// Echo the principal resolved by the session middleware.
pub async fn get_session(
    Extension(principal): Extension<SessionPrincipal>,
) -> Result<ApiSuccess<SessionResponseData>, ApiError> {
    Ok(ApiSuccess::new(StatusCode::OK, (&principal).into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResponseData {
    pub id: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&SessionPrincipal> for SessionResponseData {
    fn from(principal: &SessionPrincipal) -> Self {
        Self {
            id: principal.id.to_string(),
            role: principal.role.as_str().to_string(),
            expires_at: principal.expires_at,
        }
    }
}
