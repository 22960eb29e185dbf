//! Argon2id credential hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use gatekeep_core::config::credential::CredentialConfig;
use gatekeep_core::error::AppError;

/// Handles credential hashing and verification using Argon2id.
///
/// The cost parameters only govern newly produced digests; verification reads
/// the cost embedded in each digest, so it succeeds against digests produced
/// under any cost configuration.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    /// Cost parameters applied when hashing.
    params: Params,
}

impl CredentialVerifier {
    /// Creates a verifier from the configured cost parameters.
    pub fn new(config: &CredentialConfig) -> Result<Self, AppError> {
        let params = Params::new(
            config.memory_cost_kib,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| AppError::configuration(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(Self { params })
    }

    /// Hashes a plaintext password using Argon2id with a random salt.
    ///
    /// Rejects empty input before touching the hash primitive.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.is_empty() {
            return Err(AppError::validation("Password must not be empty"));
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        let digest = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        Ok(digest.to_string())
    }

    /// Verifies a plaintext password against a stored Argon2id digest.
    ///
    /// Returns `Ok(true)` if the password matches, `Ok(false)` if not, and an
    /// error only when the digest itself cannot be parsed.
    pub fn verify(&self, password: &str, digest: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| AppError::validation(format!("Malformed credential digest: {e}")))?;

        // Parameters come from the digest, not from self.params.
        let argon2 = Argon2::default();
        match argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> CredentialVerifier {
        // Low-cost parameters to keep the test suite fast.
        CredentialVerifier::new(&CredentialConfig {
            memory_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn hash_then_verify_roundtrip() {
        let v = verifier();
        let digest = v.hash("correct horse battery staple").unwrap();
        assert!(v.verify("correct horse battery staple", &digest).unwrap());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let v = verifier();
        let digest = v.hash("hunter2").unwrap();
        assert!(!v.verify("hunter3", &digest).unwrap());
    }

    #[test]
    fn empty_password_fails_to_hash() {
        let v = verifier();
        let err = v.hash("").unwrap_err();
        assert_eq!(err.kind, gatekeep_core::error::ErrorKind::Validation);
    }

    #[test]
    fn malformed_digest_is_an_error_not_a_mismatch() {
        let v = verifier();
        let err = v.verify("anything", "not-a-phc-string").unwrap_err();
        assert_eq!(err.kind, gatekeep_core::error::ErrorKind::Validation);
    }

    #[test]
    fn verify_succeeds_across_cost_factors() {
        let cheap = verifier();
        let expensive = CredentialVerifier::new(&CredentialConfig {
            memory_cost_kib: 2048,
            time_cost: 2,
            parallelism: 1,
        })
        .unwrap();

        let digest = expensive.hash("portable").unwrap();
        // The cheap verifier still verifies: cost lives in the digest.
        assert!(cheap.verify("portable", &digest).unwrap());
    }
}
