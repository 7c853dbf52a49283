//! Credential Hasher
//!
//! Salted Argon2id hashing shared by user passwords and stored refresh tokens.

use crate::config::AuthConfig;
use crate::error::AuthError;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// One-way hasher with a fixed work factor
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// Build a hasher from the configured Argon2 work factor
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("Invalid Argon2 parameters: {}", e)))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext into a PHC string carrying its own salt and parameters
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)?
            .to_string();

        Ok(hash)
    }

    /// Verify a plaintext against a digest produced by [`CredentialHasher::hash`]
    pub fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(digest).map_err(|e| {
            tracing::error!("Stored digest is not a valid PHC string: {:?}", e);
            AuthError::Internal
        })?;

        Ok(self
            .argon2()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(&test_config()).unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = hasher();
        for plaintext in ["Secret123", "correct horse battery staple", "ünïcødé-pässwörd"] {
            let digest = hasher.hash(plaintext).unwrap();
            assert_ne!(digest, plaintext);
            assert!(hasher.verify(plaintext, &digest).unwrap());
        }
    }

    #[test]
    fn test_altered_plaintext_fails() {
        let hasher = hasher();
        let digest = hasher.hash("Secret123").unwrap();
        assert!(!hasher.verify("Secret124", &digest).unwrap());
        assert!(!hasher.verify("secret123", &digest).unwrap());
        assert!(!hasher.verify("", &digest).unwrap());
    }

    #[test]
    fn test_salted() {
        let hasher = hasher();
        let first = hasher.hash("Secret123").unwrap();
        let second = hasher.hash("Secret123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_long_input_is_not_truncated() {
        let hasher = hasher();
        let long = "x".repeat(200);
        let digest = hasher.hash(&long).unwrap();
        let mut altered = long.clone();
        altered.push('y');
        assert!(!hasher.verify(&altered, &digest).unwrap());
    }

    #[test]
    fn test_malformed_digest() {
        assert!(hasher().verify("Secret123", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let config = AuthConfig {
            argon2_parallelism: 0,
            ..test_config()
        };
        assert!(CredentialHasher::new(&config).is_err());
    }
}
