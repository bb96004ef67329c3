use thiserror::Error;

/// Errors raised while issuing or resolving a session token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session token is invalid")]
    Invalid,

    #[error("Session token has expired")]
    Expired,

    /// Signature checked out but the claims do not describe an account.
    #[error("Session token carries malformed claims: {0}")]
    Malformed(String),

    #[error("Failed to sign session token: {0}")]
    Signing(String),
}

impl From<auth::JwtError> for SessionError {
    fn from(err: auth::JwtError) -> Self {
        match err {
            auth::JwtError::TokenExpired => SessionError::Expired,
            auth::JwtError::EncodingFailed(msg) => SessionError::Signing(msg),
            auth::JwtError::DecodingFailed(_) | auth::JwtError::InvalidToken(_) => {
                SessionError::Invalid
            }
        }
    }
}
