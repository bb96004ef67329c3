//! Authentication utilities library
//!
//! Reusable primitives for services that authenticate accounts:
//! - Password hashing and verification (Argon2id)
//! - JWT token encoding and validation (HS256)
//! - Session token issue, resolution and sliding renewal
//!
//! Lockout policy, account storage and the login decision itself live in the
//! service that owns the accounts; this crate only provides the building blocks.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("Secret@123").unwrap();
//! assert!(hasher.verify("Secret@123", &hash).unwrap());
//! assert!(!hasher.verify("secret@123", &hash).unwrap());
//! ```
//!
//! ## Session Tokens
//! ```
//! use auth::SessionIssuer;
//! use chrono::{Duration, Utc};
//!
//! let issuer = SessionIssuer::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     Duration::days(30),
//!     Duration::hours(24),
//! );
//!
//! let now = Utc::now();
//! let session = issuer.issue("account-id", "ELDER", now).unwrap();
//! let claims = issuer.resolve(&session.token, now).unwrap();
//! assert_eq!(claims.sub, "account-id");
//! assert_eq!(claims.role, "ELDER");
//! ```

pub mod jwt;
pub mod password;
pub mod session;

// Re-export commonly used items
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use session::SessionIssuer;
pub use session::SessionToken;
