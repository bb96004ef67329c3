use std::sync::Arc;

use auth::SessionIssuer;
use auth::SessionToken;

use crate::account::models::AuthenticatedIdentity;
use crate::account::ports::Clock;
use crate::session::errors::SessionError;
use crate::session::models::IssuedSession;
use crate::session::models::ResolvedSession;
use crate::session::models::SessionPrincipal;
use crate::session::ports::SessionServicePort;

/// Session claims issuer backed by HS256 tokens.
pub struct SessionService<C>
where
    C: Clock,
{
    issuer: SessionIssuer,
    clock: Arc<C>,
}

impl<C> SessionService<C>
where
    C: Clock,
{
    pub fn new(issuer: SessionIssuer, clock: Arc<C>) -> Self {
        Self { issuer, clock }
    }

    fn into_issued(session: SessionToken) -> Result<IssuedSession, SessionError> {
        let principal = SessionPrincipal::try_from(&session.claims)?;
        Ok(IssuedSession {
            token: session.token,
            principal,
        })
    }
}

impl<C> SessionServicePort for SessionService<C>
where
    C: Clock,
{
    fn issue(&self, identity: &AuthenticatedIdentity) -> Result<IssuedSession, SessionError> {
        let session = self
            .issuer
            .issue(identity.id, identity.role, self.clock.now())?;

        tracing::debug!(account_id = %identity.id, role = %identity.role, "Session issued");
        Self::into_issued(session)
    }

    fn resolve(&self, token: &str) -> Result<ResolvedSession, SessionError> {
        let now = self.clock.now();
        let claims = self.issuer.resolve(token, now)?;
        let principal = SessionPrincipal::try_from(&claims)?;

        let renewed = if self.issuer.needs_renewal(&claims, now) {
            let session = self.issuer.renew(&claims, now)?;
            tracing::debug!(account_id = %principal.id, "Session renewed");
            Some(Self::into_issued(session)?)
        } else {
            None
        };

        Ok(ResolvedSession { principal, renewed })
    }
}
