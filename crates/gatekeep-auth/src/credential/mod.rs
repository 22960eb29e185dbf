//! Password hashing and verification.

pub mod verifier;

pub use verifier::CredentialVerifier;
