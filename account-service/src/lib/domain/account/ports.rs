use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::AccountError;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::models::AuthResult;
use crate::account::models::CreateAccountCommand;
use crate::account::models::EmailAddress;
use crate::account::models::LoginCounters;

/// Port for account domain service operations.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Register a new password account.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Password` - Hashing failed
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: CreateAccountCommand) -> Result<Account, AccountError>;

    /// Decide whether `identifier`/`secret` may sign in.
    ///
    /// Denials are reported as `Ok(AuthResult::Denied(_))`; the reason is for
    /// logging only and must not reach the client.
    ///
    /// # Errors
    /// * `ConcurrentUpdate` - Counter write kept conflicting
    /// * `Password` / `DatabaseError` - Infrastructure failure
    async fn authenticate(&self, identifier: &str, secret: &str)
        -> Result<AuthResult, AccountError>;
}

/// Persistence operations for the account aggregate.
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Persist a new account.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, account: Account) -> Result<Account, AccountError>;

    /// Retrieve account by identifier.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AccountError>;

    /// Retrieve account by normalized email (exact match).
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Account>, AccountError>;

    /// Atomically replace the login counters if the stored version still
    /// equals `expected_version`.
    ///
    /// # Returns
    /// The new version of the account
    ///
    /// # Errors
    /// * `Conflict` - The account was modified since `expected_version`
    /// * `NotFound` - Account does not exist
    /// * `DatabaseError` - Database operation failed
    async fn update_counters(
        &self,
        id: &AccountId,
        expected_version: i64,
        counters: &LoginCounters,
    ) -> Result<i64, AccountError>;
}

/// One-way secret hashing and verification.
#[async_trait]
pub trait SecretHasher: Send + Sync + 'static {
    /// # Errors
    /// * `Password` - Hashing failed
    async fn hash_secret(&self, secret: &str) -> Result<String, AccountError>;

    /// Constant-time comparison of `secret` against `hash`.
    ///
    /// # Errors
    /// * `Password` - Stored hash is unusable
    async fn verify_secret(&self, secret: &str, hash: &str) -> Result<bool, AccountError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}
