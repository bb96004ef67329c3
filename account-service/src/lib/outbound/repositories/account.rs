use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::errors::AccountError;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::models::DisplayName;
use crate::account::models::EmailAddress;
use crate::account::models::LoginCounters;
use crate::account::models::Role;
use crate::account::ports::AccountRepository;

const SELECT_ACCOUNT: &str = r#"
    SELECT id, email, name, password_hash, role, is_active,
           failed_login_count, last_failed_login, account_locked_until,
           version, created_at
    FROM accounts
"#;

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: Option<String>,
    role: String,
    is_active: bool,
    failed_login_count: i32,
    last_failed_login: Option<DateTime<Utc>>,
    account_locked_until: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AccountError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: AccountId(row.id),
            email: EmailAddress::from_stored(row.email),
            display_name: DisplayName::from_stored(row.name),
            password_hash: row.password_hash,
            role: row
                .role
                .parse::<Role>()
                .map_err(|e| AccountError::DatabaseError(format!("Corrupt account row: {}", e)))?,
            is_active: row.is_active,
            counters: LoginCounters {
                failed_login_count: u32::try_from(row.failed_login_count).unwrap_or(0),
                last_failed_login: row.last_failed_login,
                locked_until: row.account_locked_until,
            },
            version: row.version,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn create(&self, account: Account) -> Result<Account, AccountError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, email, name, password_hash, role, is_active,
                failed_login_count, last_failed_login, account_locked_until,
                version, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(account.id.0)
        .bind(account.email.as_str())
        .bind(account.display_name.as_str())
        .bind(account.password_hash.as_deref())
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(i32::try_from(account.counters.failed_login_count).unwrap_or(i32::MAX))
        .bind(account.counters.last_failed_login)
        .bind(account.counters.locked_until)
        .bind(account.version)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some("accounts_email_key")
                {
                    return AccountError::EmailAlreadyExists(account.email.as_str().to_string());
                }
            }
            AccountError::DatabaseError(e.to_string())
        })?;

        Ok(account)
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AccountError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!("{} WHERE id = $1", SELECT_ACCOUNT))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Account>, AccountError> {
        let row =
            sqlx::query_as::<_, AccountRow>(&format!("{} WHERE email = $1", SELECT_ACCOUNT))
                .bind(email.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        row.map(Account::try_from).transpose()
    }

    async fn update_counters(
        &self,
        id: &AccountId,
        expected_version: i64,
        counters: &LoginCounters,
    ) -> Result<i64, AccountError> {
        let version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET failed_login_count = $3,
                last_failed_login = $4,
                account_locked_until = $5,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(id.0)
        .bind(expected_version)
        .bind(i32::try_from(counters.failed_login_count).unwrap_or(i32::MAX))
        .bind(counters.last_failed_login)
        .bind(counters.locked_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        if let Some(version) = version {
            return Ok(version);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        if exists {
            Err(AccountError::Conflict(id.to_string()))
        } else {
            Err(AccountError::NotFound(id.to_string()))
        }
    }
}
