use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::account::errors::AccountIdError;
use crate::account::errors::DisplayNameError;
use crate::account::errors::EmailError;
use crate::account::errors::PasswordPolicyError;
use crate::account::errors::RoleError;

/// Account aggregate entity.
///
/// The authenticator only ever writes `counters` (and bumps `version` through
/// the repository); every other field is owned by registration.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub email: EmailAddress,
    pub display_name: DisplayName,
    /// Absent for accounts created through federated sign-in.
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub counters: LoginCounters,
    /// Incremented by every counter write; used for compare-and-set.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// Brute-force protection state of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoginCounters {
    pub failed_login_count: u32,
    pub last_failed_login: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LoginCounters {
    /// Counters after a successful verification.
    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_login_count > 0
    }
}

/// Account unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(pub Uuid);

impl AccountId {
    /// Generate a new random account ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an account ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, AccountIdError> {
        Uuid::parse_str(s)
            .map(AccountId)
            .map_err(|e| AccountIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Login identifier.
///
/// Always stored and compared in normalized form (trimmed, lowercase), which
/// makes lookups case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Normalize and validate an email address.
    ///
    /// # Errors
    /// * `Empty` - Blank input
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: impl AsRef<str>) -> Result<Self, EmailError> {
        let normalized = email.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(EmailError::Empty);
        }

        email_address::EmailAddress::from_str(&normalized)
            .map(|_| EmailAddress(normalized))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    /// Wrap an address read back from storage as-is.
    pub(crate) fn from_stored(email: String) -> Self {
        EmailAddress(email)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Human-readable account name, 2 to 100 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    const MIN_LENGTH: usize = 2;
    const MAX_LENGTH: usize = 100;

    /// Wrap a name read back from storage as-is.
    ///
    /// Rows written before the length rule existed still load.
    pub(crate) fn from_stored(name: String) -> Self {
        DisplayName(name)
    }

    /// # Errors
    /// * `TooShort` - Fewer than 2 characters after trimming
    /// * `TooLong` - More than 100 characters after trimming
    pub fn new(name: impl AsRef<str>) -> Result<Self, DisplayNameError> {
        let name = name.as_ref().trim();
        let length = name.chars().count();

        if length < Self::MIN_LENGTH {
            Err(DisplayNameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(DisplayNameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Elder,
    Caregiver,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Elder => "ELDER",
            Role::Caregiver => "CAREGIVER",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse a role a new user may pick for themselves.
    ///
    /// # Errors
    /// * `Unknown` - Not a role
    /// * `NotSelfAssignable` - Role is reserved for operators
    pub fn for_registration(s: &str) -> Result<Self, RoleError> {
        match s.parse::<Role>()? {
            Role::Admin => Err(RoleError::NotSelfAssignable(s.to_string())),
            role => Ok(role),
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ELDER" => Ok(Role::Elder),
            "CAREGIVER" => Ok(Role::Caregiver),
            "ADMIN" => Ok(Role::Admin),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plaintext password that satisfies the registration policy.
///
/// Only used when choosing a password; login accepts any submitted secret of
/// the minimum length and lets verification decide.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(String);

impl NewPassword {
    pub const MIN_LENGTH: usize = 8;
    const SPECIAL: &'static str = "@$!%*?&";

    /// # Errors
    /// * `PasswordPolicyError` - First policy rule the password breaks
    pub fn new(password: String) -> Result<Self, PasswordPolicyError> {
        let length = password.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            });
        }
        if !password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || Self::SPECIAL.contains(c))
        {
            return Err(PasswordPolicyError::InvalidCharacters);
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(PasswordPolicyError::MissingLowercase);
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(PasswordPolicyError::MissingUppercase);
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordPolicyError::MissingDigit);
        }
        if !password.chars().any(|c| Self::SPECIAL.contains(c)) {
            return Err(PasswordPolicyError::MissingSpecial);
        }

        Ok(Self(password))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NewPassword(***)")
    }
}

/// Command to register a new password account
#[derive(Debug)]
pub struct CreateAccountCommand {
    pub display_name: DisplayName,
    pub email: EmailAddress,
    pub password: NewPassword,
    pub role: Role,
}

impl CreateAccountCommand {
    pub fn new(
        display_name: DisplayName,
        email: EmailAddress,
        password: NewPassword,
        role: Role,
    ) -> Self {
        Self {
            display_name,
            email,
            password,
            role,
        }
    }
}

/// Minimal identity released by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub id: AccountId,
    pub email: EmailAddress,
    pub display_name: DisplayName,
    pub role: Role,
}

impl From<&Account> for AuthenticatedIdentity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            role: account.role,
        }
    }
}

/// Why a credential attempt was refused.
///
/// Internal only: callers outside the domain see a single generic denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    BadInput,
    NotFound,
    NoSecretSet,
    Locked,
    BadSecret,
    Inactive,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::BadInput => "bad_input",
            DenialReason::NotFound => "not_found",
            DenialReason::NoSecretSet => "no_secret_set",
            DenialReason::Locked => "locked",
            DenialReason::BadSecret => "bad_secret",
            DenialReason::Inactive => "inactive",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a credential attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Allowed(AuthenticatedIdentity),
    Denied(DenialReason),
}

impl AuthResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthResult::Allowed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        let email = EmailAddress::new("  User@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "user@example.com");
        assert_eq!(email, EmailAddress::new("user@example.com").unwrap());
    }

    #[test]
    fn test_email_rejects_blank_and_malformed() {
        assert_eq!(EmailAddress::new("   "), Err(EmailError::Empty));
        assert!(matches!(
            EmailAddress::new("notanemail"),
            Err(EmailError::InvalidFormat(_))
        ));
        assert!(matches!(
            EmailAddress::new("user@"),
            Err(EmailError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_display_name_bounds() {
        assert!(matches!(
            DisplayName::new("A"),
            Err(DisplayNameError::TooShort { min: 2, actual: 1 })
        ));
        assert!(matches!(
            DisplayName::new("x".repeat(101)),
            Err(DisplayNameError::TooLong { max: 100, actual: 101 })
        ));
        assert_eq!(DisplayName::new(" John Doe ").unwrap().as_str(), "John Doe");
    }

    #[test]
    fn test_new_password_policy() {
        assert!(NewPassword::new("SecurePass123!".to_string()).is_ok());
        assert!(matches!(
            NewPassword::new("short".to_string()),
            Err(PasswordPolicyError::TooShort { .. })
        ));
        assert_eq!(
            NewPassword::new("nouppercase123!".to_string()),
            Err(PasswordPolicyError::MissingUppercase)
        );
        assert_eq!(
            NewPassword::new("NOLOWERCASE123!".to_string()),
            Err(PasswordPolicyError::MissingLowercase)
        );
        assert_eq!(
            NewPassword::new("NoNumbers!".to_string()),
            Err(PasswordPolicyError::MissingDigit)
        );
        assert_eq!(
            NewPassword::new("NoSpecialChar123".to_string()),
            Err(PasswordPolicyError::MissingSpecial)
        );
        assert_eq!(
            NewPassword::new("Has Space123!".to_string()),
            Err(PasswordPolicyError::InvalidCharacters)
        );
    }

    #[test]
    fn test_new_password_checks_every_character() {
        for password in ["Pass word123!", "Password123!#", "Password123!é", "#Password123!"] {
            assert_eq!(
                NewPassword::new(password.to_string()),
                Err(PasswordPolicyError::InvalidCharacters),
                "{}",
                password
            );
        }
        assert!(NewPassword::new("Pass@word123!".to_string()).is_ok());
    }

    #[test]
    fn test_new_password_debug_is_redacted() {
        let password = NewPassword::new("SecurePass123!".to_string()).unwrap();
        assert!(!format!("{:?}", password).contains("SecurePass"));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("ELDER".parse::<Role>(), Ok(Role::Elder));
        assert_eq!("CAREGIVER".parse::<Role>(), Ok(Role::Caregiver));
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert!(matches!(
            "INVALID_ROLE".parse::<Role>(),
            Err(RoleError::Unknown(_))
        ));
        assert_eq!(Role::Caregiver.to_string(), "CAREGIVER");
    }

    #[test]
    fn test_admin_is_not_self_assignable() {
        assert_eq!(Role::for_registration("ELDER"), Ok(Role::Elder));
        assert!(matches!(
            Role::for_registration("ADMIN"),
            Err(RoleError::NotSelfAssignable(_))
        ));
    }
}
