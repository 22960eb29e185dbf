//! Token fingerprinting.

use sha2::{Digest, Sha256};

/// Computes the one-way digest of a token string, hex-encoded.
///
/// Used for index lookups without ever storing the token itself.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_token_specific() {
        let a = token_fingerprint("token-a");
        assert_eq!(a, token_fingerprint("token-a"));
        assert_ne!(a, token_fingerprint("token-b"));
        assert_eq!(a.len(), 64);
    }
}
