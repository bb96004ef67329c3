use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::OnceCell;

use crate::account::errors::AccountError;
use crate::account::lockout::LockoutPolicy;
use crate::account::lockout::MIN_SECRET_LENGTH;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::models::AuthResult;
use crate::account::models::AuthenticatedIdentity;
use crate::account::models::CreateAccountCommand;
use crate::account::models::DenialReason;
use crate::account::models::EmailAddress;
use crate::account::models::LoginCounters;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;
use crate::account::ports::Clock;
use crate::account::ports::SecretHasher;

/// Hashed once and verified against when there is no stored hash to check.
const TIMING_SECRET: &str = "timing-equalization-secret";

/// Domain service implementation for account operations.
///
/// Owns the credential decision procedure and the brute-force counters.
/// Counter writes go through `AccountRepository::update_counters`, a
/// compare-and-set on the account version; a lost race re-reads the account
/// and re-applies the decision to the fresh state.
pub struct AccountService<AR, SH, C>
where
    AR: AccountRepository,
    SH: SecretHasher,
    C: Clock,
{
    repository: Arc<AR>,
    hasher: Arc<SH>,
    clock: Arc<C>,
    policy: LockoutPolicy,
    timing_hash: OnceCell<String>,
}

impl<AR, SH, C> AccountService<AR, SH, C>
where
    AR: AccountRepository,
    SH: SecretHasher,
    C: Clock,
{
    /// Create a new account service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Account persistence implementation
    /// * `hasher` - Password hashing and verification
    /// * `clock` - Time source for lockout decisions
    /// * `policy` - Lockout thresholds
    pub fn new(repository: Arc<AR>, hasher: Arc<SH>, clock: Arc<C>, policy: LockoutPolicy) -> Self {
        Self {
            repository,
            hasher,
            clock,
            policy,
            timing_hash: OnceCell::new(),
        }
    }

    fn parse_credentials(identifier: &str, secret: &str) -> Option<EmailAddress> {
        if secret.is_empty() || secret.chars().count() < MIN_SECRET_LENGTH {
            return None;
        }
        EmailAddress::new(identifier).ok()
    }

    fn deny(email: Option<&EmailAddress>, reason: DenialReason) -> AuthResult {
        let email = email.map(EmailAddress::as_str);
        match reason {
            DenialReason::BadInput => {
                tracing::debug!(reason = %reason, "Credentials rejected before lookup");
            }
            DenialReason::Locked | DenialReason::BadSecret => {
                tracing::warn!(email = ?email, reason = %reason, "Authentication denied");
            }
            _ => {
                tracing::info!(email = ?email, reason = %reason, "Authentication denied");
            }
        }
        AuthResult::Denied(reason)
    }

    /// Run one verification against a throwaway hash so an unknown account
    /// or a missing secret costs about as much as a wrong password.
    async fn burn_verification(&self, secret: &str) {
        let hash = match self
            .timing_hash
            .get_or_try_init(|| self.hasher.hash_secret(TIMING_SECRET))
            .await
        {
            Ok(hash) => hash,
            Err(e) => {
                tracing::debug!(error = %e, "Could not prepare timing hash");
                return;
            }
        };

        if let Err(e) = self.hasher.verify_secret(secret, hash).await {
            tracing::debug!(error = %e, "Timing verification failed");
        }
    }

    async fn reload(&self, id: &AccountId) -> Result<Option<Account>, AccountError> {
        self.repository.find_by_id(id).await
    }

    /// Count one wrong password against `account`.
    ///
    /// Returns the denial to report: `BadSecret` once the increment is
    /// stored, or `Locked` if a concurrent attempt locked the account first
    /// (in which case nothing is written).
    async fn record_failure(
        &self,
        mut account: Account,
        now: DateTime<Utc>,
    ) -> Result<DenialReason, AccountError> {
        for _ in 0..=self.policy.max_update_retries {
            let counters = self.policy.after_failure(&account.counters, now);

            match self
                .repository
                .update_counters(&account.id, account.version, &counters)
                .await
            {
                Ok(_) => {
                    if counters.locked_until.is_some() {
                        tracing::warn!(
                            account_id = %account.id,
                            failed_login_count = counters.failed_login_count,
                            locked_until = ?counters.locked_until,
                            "Account locked after repeated failures"
                        );
                    }
                    return Ok(DenialReason::BadSecret);
                }
                Err(AccountError::Conflict(_)) => {
                    tracing::debug!(account_id = %account.id, "Counter update conflicted");
                    account = match self.reload(&account.id).await? {
                        Some(fresh) => fresh,
                        None => return Ok(DenialReason::NotFound),
                    };
                    if self.policy.is_locked(&account.counters, now) {
                        return Ok(DenialReason::Locked);
                    }
                }
                Err(AccountError::NotFound(_)) => return Ok(DenialReason::NotFound),
                Err(e) => return Err(e),
            }
        }

        tracing::error!(account_id = %account.id, "Giving up on failure counter update");
        Err(AccountError::ConcurrentUpdate(account.id.to_string()))
    }

    /// Reset the counters of `account` after a correct password.
    ///
    /// Returns a denial only if a concurrent attempt locked the account while
    /// this one was verifying.
    async fn clear_failures(
        &self,
        account: &mut Account,
        now: DateTime<Utc>,
    ) -> Result<Option<DenialReason>, AccountError> {
        let cleared = LoginCounters::cleared();

        for _ in 0..=self.policy.max_update_retries {
            if !account.counters.has_failures() {
                return Ok(None);
            }

            match self
                .repository
                .update_counters(&account.id, account.version, &cleared)
                .await
            {
                Ok(version) => {
                    tracing::debug!(account_id = %account.id, "Failure counters reset");
                    account.counters = cleared;
                    account.version = version;
                    return Ok(None);
                }
                Err(AccountError::Conflict(_)) => {
                    *account = match self.reload(&account.id).await? {
                        Some(fresh) => fresh,
                        None => return Ok(Some(DenialReason::NotFound)),
                    };
                    if self.policy.is_locked(&account.counters, now) {
                        return Ok(Some(DenialReason::Locked));
                    }
                }
                Err(AccountError::NotFound(_)) => return Ok(Some(DenialReason::NotFound)),
                Err(e) => return Err(e),
            }
        }

        tracing::error!(account_id = %account.id, "Giving up on counter reset");
        Err(AccountError::ConcurrentUpdate(account.id.to_string()))
    }
}

#[async_trait]
impl<AR, SH, C> AccountServicePort for AccountService<AR, SH, C>
where
    AR: AccountRepository,
    SH: SecretHasher,
    C: Clock,
{
    async fn register(&self, command: CreateAccountCommand) -> Result<Account, AccountError> {
        let password_hash = self.hasher.hash_secret(command.password.expose()).await?;

        let account = Account {
            id: AccountId::new(),
            email: command.email,
            display_name: command.display_name,
            password_hash: Some(password_hash),
            role: command.role,
            is_active: true,
            counters: LoginCounters::default(),
            version: 0,
            created_at: self.clock.now(),
        };

        let created = self.repository.create(account).await?;
        tracing::info!(account_id = %created.id, role = %created.role, "Account registered");

        Ok(created)
    }

    async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<AuthResult, AccountError> {
        let Some(email) = Self::parse_credentials(identifier, secret) else {
            return Ok(Self::deny(None, DenialReason::BadInput));
        };

        let Some(mut account) = self.repository.find_by_email(&email).await? else {
            self.burn_verification(secret).await;
            return Ok(Self::deny(Some(&email), DenialReason::NotFound));
        };

        let Some(password_hash) = account.password_hash.clone() else {
            self.burn_verification(secret).await;
            return Ok(Self::deny(Some(&email), DenialReason::NoSecretSet));
        };

        let now = self.clock.now();
        if self.policy.is_locked(&account.counters, now) {
            return Ok(Self::deny(Some(&email), DenialReason::Locked));
        }

        if !self.hasher.verify_secret(secret, &password_hash).await? {
            let reason = self.record_failure(account, now).await?;
            return Ok(Self::deny(Some(&email), reason));
        }

        // An inactive account presenting the right password still has its
        // counters cleared unless the policy asks for the inactive check first.
        if self.policy.reset_before_active_check {
            if let Some(reason) = self.clear_failures(&mut account, now).await? {
                return Ok(Self::deny(Some(&email), reason));
            }
        }

        if !account.is_active {
            return Ok(Self::deny(Some(&email), DenialReason::Inactive));
        }

        if !self.policy.reset_before_active_check {
            if let Some(reason) = self.clear_failures(&mut account, now).await? {
                return Ok(Self::deny(Some(&email), reason));
            }
        }

        tracing::info!(account_id = %account.id, role = %account.role, "Authentication succeeded");
        Ok(AuthResult::Allowed(AuthenticatedIdentity::from(&account)))
    }
}
