use crate::account::models::AuthenticatedIdentity;
use crate::session::errors::SessionError;
use crate::session::models::IssuedSession;
use crate::session::models::ResolvedSession;

/// Port for session token operations.
///
/// Resolution is purely cryptographic: it never consults account storage.
pub trait SessionServicePort: Send + Sync + 'static {
    /// Sign a session for an identity that has just been allowed in.
    ///
    /// # Errors
    /// * `Signing` - Token could not be signed
    fn issue(&self, identity: &AuthenticatedIdentity) -> Result<IssuedSession, SessionError>;

    /// Verify a presented token and renew it when it is old enough.
    ///
    /// # Errors
    /// * `Expired` - Token lifetime has elapsed
    /// * `Invalid` - Signature or structure is wrong
    /// * `Malformed` - Claims do not name an account and role
    fn resolve(&self, token: &str) -> Result<ResolvedSession, SessionError>;
}
