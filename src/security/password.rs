use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;
use tracing::error;

use crate::config::SecurityConfig;

/// Argon2id credential hashing with cost factors injected from
/// [`SecurityConfig`] instead of a process-wide default.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hashes a password with a fresh random salt, producing a PHC string.
    /// Hashing the same password twice yields two different strings.
    /// Note: runs in `spawn_blocking` because Argon2 is CPU-intensive and
    /// would block the async runtime if run directly.
    pub async fn hash(&self, password: String) -> Result<String> {
        let argon2 = self.argon2.clone();

        task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
        })
        .await
        .context("Password hashing task panicked")?
    }

    /// Checks a password against a stored PHC string in constant time.
    /// Returns `false` both for a mismatch and for malformed stored
    /// material; it never errors, so callers cannot distinguish the two.
    /// Verification reads the cost parameters embedded in the stored hash,
    /// so records hashed under older settings keep verifying.
    pub async fn verify(&self, password: String, stored_hash: String) -> bool {
        let argon2 = self.argon2.clone();

        let outcome = task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&stored_hash) else {
                return false;
            };

            argon2.verify_password(password.as_bytes(), &parsed).is_ok()
        })
        .await;

        match outcome {
            Ok(valid) => valid,
            Err(e) => {
                error!(error = %e, "Password verification task panicked");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(&SecurityConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn same_password_hashes_differently() {
        let hasher = hasher();
        let first = hasher.hash("hunter2hunter2".to_string()).await.unwrap();
        let second = hasher.hash("hunter2hunter2".to_string()).await.unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("hunter2hunter2".to_string(), first).await);
        assert!(hasher.verify("hunter2hunter2".to_string(), second).await);
    }

    #[tokio::test]
    async fn wrong_password_fails_verification() {
        let hasher = hasher();
        let stored = hasher.hash("correct horse".to_string()).await.unwrap();

        assert!(!hasher.verify("battery staple".to_string(), stored).await);
    }

    #[tokio::test]
    async fn malformed_stored_hash_verifies_false_without_panicking() {
        let hasher = hasher();

        for stored in ["", "not-a-phc-string", "$argon2id$v=19$broken", "plaintext"] {
            assert!(
                !hasher
                    .verify("anything".to_string(), stored.to_string())
                    .await
            );
        }
    }

    #[tokio::test]
    async fn produces_argon2id_phc_strings() {
        let stored = hasher().hash("some password".to_string()).await.unwrap();
        assert!(stored.starts_with("$argon2id$"));
    }

    #[test]
    fn rejects_invalid_cost_parameters() {
        let config = SecurityConfig {
            argon2_time_cost: 0,
            ..SecurityConfig::default()
        };
        assert!(CredentialHasher::new(&config).is_err());
    }
}
