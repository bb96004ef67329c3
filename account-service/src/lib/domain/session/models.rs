use chrono::DateTime;
use chrono::Utc;

use crate::account::models::AccountId;
use crate::account::models::Role;
use crate::session::errors::SessionError;

/// Who a session token speaks for, as embedded at issue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPrincipal {
    pub id: AccountId,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<&auth::Claims> for SessionPrincipal {
    type Error = SessionError;

    fn try_from(claims: &auth::Claims) -> Result<Self, Self::Error> {
        let id = AccountId::from_string(&claims.sub)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        let issued_at = claims
            .issued_at()
            .ok_or_else(|| SessionError::Malformed(format!("iat out of range: {}", claims.iat)))?;
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| SessionError::Malformed(format!("exp out of range: {}", claims.exp)))?;

        Ok(Self {
            id,
            role,
            issued_at,
            expires_at,
        })
    }
}

/// Freshly signed token and the principal it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub principal: SessionPrincipal,
}

/// Result of resolving a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub principal: SessionPrincipal,
    /// Replacement token when the presented one is past the renewal age.
    pub renewed: Option<IssuedSession>,
}
