use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;

use crate::account::errors::AccountError;
use crate::account::ports::SecretHasher;

/// Argon2id hashing run on the blocking pool so slow verifications do not
/// stall the async workers.
#[derive(Clone)]
pub struct Argon2SecretHasher {
    hasher: Arc<PasswordHasher>,
}

impl Argon2SecretHasher {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            hasher: Arc::new(hasher),
        }
    }
}

#[async_trait]
impl SecretHasher for Argon2SecretHasher {
    async fn hash_secret(&self, secret: &str) -> Result<String, AccountError> {
        let hasher = Arc::clone(&self.hasher);
        let secret = secret.to_string();

        let hash = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| AccountError::Unknown(format!("Hashing task failed: {}", e)))??;

        Ok(hash)
    }

    async fn verify_secret(&self, secret: &str, hash: &str) -> Result<bool, AccountError> {
        let hasher = Arc::clone(&self.hasher);
        let secret = secret.to_string();
        let hash = hash.to_string();

        let matches = tokio::task::spawn_blocking(move || hasher.verify(&secret, &hash))
            .await
            .map_err(|e| AccountError::Unknown(format!("Verification task failed: {}", e)))??;

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2SecretHasher {
        Argon2SecretHasher::new(PasswordHasher::with_params(1024, 1, 1).unwrap())
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = hasher();

        let hash = hasher.hash_secret("SecurePass123!").await.unwrap();

        assert!(hasher.verify_secret("SecurePass123!", &hash).await.unwrap());
        assert!(!hasher.verify_secret("securepass123!", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_hash_is_an_error() {
        let result = hasher().verify_secret("SecurePass123!", "not-a-phc-string").await;

        assert!(matches!(result, Err(AccountError::Password(_))));
    }
}
