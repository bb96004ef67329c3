use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use super::INVALID_CREDENTIALS;
use crate::account::models::AuthResult;
use crate::account::models::AuthenticatedIdentity;
use crate::inbound::http::middleware::session_cookie;
use crate::inbound::http::router::AppState;

/// Credential sign-in.
///
/// Every denial, whatever its reason, is answered with the same 401 body so
/// the response does not reveal whether the account exists or is locked.
pub async fn authenticate(
    State(state): State<AppState>,
    Json(body): Json<AuthenticateRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = match state
        .account_service
        .authenticate(&body.email, &body.password)
        .await?
    {
        AuthResult::Allowed(identity) => identity,
        AuthResult::Denied(_) => {
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))
        }
    };

    let session = state.session_service.issue(&identity)?;
    let cookie = session_cookie(&state, &session);

    Ok((
        [(header::SET_COOKIE, cookie)],
        ApiSuccess::new(
            StatusCode::OK,
            AuthenticateResponseData {
                user: (&identity).into(),
                token: session.token,
            },
        ),
    ))
}

/// Missing fields deserialize as empty strings and are refused like any
/// other bad input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticateRequestBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticateResponseData {
    pub user: IdentityData,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityData {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<&AuthenticatedIdentity> for IdentityData {
    fn from(identity: &AuthenticatedIdentity) -> Self {
        Self {
            id: identity.id.to_string(),
            email: identity.email.as_str().to_string(),
            name: identity.display_name.as_str().to_string(),
            role: identity.role.as_str().to_string(),
        }
    }
}
