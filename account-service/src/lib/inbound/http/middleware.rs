use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::inbound::http::router::AppState;
use crate::session::models::IssuedSession;

/// Response header carrying a renewed session token.
pub const SESSION_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-session-token");

/// Middleware that resolves the session token and adds the principal to
/// request extensions.
///
/// The token is read from `Authorization: Bearer` first, then from the
/// session cookie. When the token is old enough to be renewed, the fresh one
/// is returned in `x-session-token` and in a replacement cookie.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(req.headers(), &state.cookie_name)
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

    let resolved = state.session_service.resolve(&token).map_err(|e| {
        tracing::warn!(error = %e, "Session validation failed");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(resolved.principal);

    let mut response = next.run(req).await;

    if let Some(renewed) = resolved.renewed {
        let headers = response.headers_mut();
        match (
            HeaderValue::from_str(&renewed.token),
            HeaderValue::from_str(&session_cookie(&state, &renewed)),
        ) {
            (Ok(token), Ok(cookie)) => {
                headers.insert(SESSION_TOKEN_HEADER, token);
                headers.append(header::SET_COOKIE, cookie);
            }
            _ => tracing::error!("Renewed session token is not a valid header value"),
        }
    }

    Ok(response)
}

/// `Set-Cookie` value for `session`: HttpOnly, SameSite=Lax, and Secure
/// in production.
pub fn session_cookie(state: &AppState, session: &IssuedSession) -> String {
    let max_age = (session.principal.expires_at - session.principal.issued_at).num_seconds();
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        state.cookie_name, session.token, max_age
    );
    if state.production {
        cookie.push_str("; Secure");
    }
    cookie
}

fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers, cookie_name))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session-token=from-cookie"),
        );
        assert_eq!(
            extract_token(&headers, "session-token").as_deref(),
            Some("from-cookie")
        );

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(
            extract_token(&headers, "session-token").as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn test_missing_or_foreign_credentials() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers, "session-token"), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("other=value"));
        assert_eq!(extract_token(&headers, "session-token"), None);
    }
}
