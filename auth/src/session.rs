use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;

/// Issues and resolves signed session tokens.
///
/// Tokens are self-contained: resolving one never consults account storage,
/// so a token stays valid until `exp` even if the account is later locked or
/// deactivated. A token older than `update_age` is eligible for sliding
/// renewal, which re-signs the same subject and role with a fresh lifetime.
pub struct SessionIssuer {
    jwt_handler: JwtHandler,
    max_age: Duration,
    update_age: Duration,
}

/// Signed token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub claims: Claims,
}

impl SessionIssuer {
    /// Create a new session issuer.
    ///
    /// # Arguments
    /// * `secret` - HS256 signing secret
    /// * `max_age` - Token lifetime from issue
    /// * `update_age` - Token age after which sliding renewal applies
    pub fn new(secret: &[u8], max_age: Duration, update_age: Duration) -> Self {
        Self {
            jwt_handler: JwtHandler::new(secret),
            max_age,
            update_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn update_age(&self) -> Duration {
        self.update_age
    }

    /// Sign a new session token for `subject` with `role`.
    ///
    /// # Errors
    /// * `JwtError` - Token signing failed
    pub fn issue(
        &self,
        subject: impl ToString,
        role: impl ToString,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, JwtError> {
        let claims = Claims::for_subject(subject, role, now, self.max_age);
        let token = self.jwt_handler.encode(&claims)?;

        Ok(SessionToken { token, claims })
    }

    /// Verify a token's signature, check its expiry against `now` and return
    /// its claims.
    ///
    /// # Errors
    /// * `TokenExpired` - Token lifetime has elapsed at `now`
    /// * `InvalidToken` / `DecodingFailed` - Token was not issued by this issuer
    pub fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        let claims: Claims = self.jwt_handler.decode(token)?;
        if claims.is_expired(now.timestamp()) {
            return Err(JwtError::TokenExpired);
        }
        Ok(claims)
    }

    /// Whether `claims` are old enough to be re-issued.
    pub fn needs_renewal(&self, claims: &Claims, now: DateTime<Utc>) -> bool {
        claims.age(now) >= self.update_age
    }

    /// Re-sign the subject and role of `claims` with a fresh lifetime.
    ///
    /// # Errors
    /// * `JwtError` - Token signing failed
    pub fn renew(&self, claims: &Claims, now: DateTime<Utc>) -> Result<SessionToken, JwtError> {
        self.issue(&claims.sub, &claims.role, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(
            b"test_secret_key_at_least_32_bytes!",
            Duration::days(30),
            Duration::hours(24),
        )
    }

    #[test]
    fn test_issue_and_resolve() {
        let issuer = issuer();
        let now = Utc::now();

        let session = issuer.issue("acc-1", "ELDER", now).expect("Failed to issue");
        let claims = issuer.resolve(&session.token, now).expect("Failed to resolve");

        assert_eq!(claims, session.claims);
        assert_eq!(claims.sub, "acc-1");
        assert_eq!(claims.role, "ELDER");
        assert_eq!(claims.exp - claims.iat, Duration::days(30).num_seconds());
    }

    #[test]
    fn test_resolve_rejects_foreign_token() {
        let other = SessionIssuer::new(
            b"another_secret_key_at_least_32_by!",
            Duration::days(30),
            Duration::hours(24),
        );
        let session = other.issue("acc-1", "ELDER", Utc::now()).unwrap();

        assert!(issuer().resolve(&session.token, Utc::now()).is_err());
    }

    #[test]
    fn test_resolve_rejects_expired_token() {
        let issuer = issuer();
        let session = issuer
            .issue("acc-1", "ELDER", Utc::now() - Duration::days(31))
            .unwrap();

        assert!(matches!(
            issuer.resolve(&session.token, Utc::now()),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_expiry_is_judged_at_given_time() {
        let issuer = issuer();
        let issued_at = Utc::now() - Duration::days(40);
        let session = issuer.issue("acc-1", "ELDER", issued_at).unwrap();
        let expires_at = issued_at + Duration::days(30);

        assert!(issuer.resolve(&session.token, expires_at).is_ok());
        assert!(matches!(
            issuer.resolve(&session.token, expires_at + Duration::seconds(1)),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_needs_renewal_after_update_age() {
        let issuer = issuer();
        let issued_at = Utc::now();
        let session = issuer.issue("acc-1", "CAREGIVER", issued_at).unwrap();

        assert!(!issuer.needs_renewal(&session.claims, issued_at + Duration::hours(23)));
        assert!(issuer.needs_renewal(&session.claims, issued_at + Duration::hours(24)));
    }

    #[test]
    fn test_renew_keeps_subject_and_role() {
        let issuer = issuer();
        let issued_at = Utc::now() - Duration::days(2);
        let session = issuer.issue("acc-1", "CAREGIVER", issued_at).unwrap();

        let now = Utc::now();
        let renewed = issuer.renew(&session.claims, now).unwrap();

        assert_eq!(renewed.claims.sub, "acc-1");
        assert_eq!(renewed.claims.role, "CAREGIVER");
        assert_eq!(renewed.claims.iat, now.timestamp());
        assert!(renewed.claims.exp > session.claims.exp);
    }
}
