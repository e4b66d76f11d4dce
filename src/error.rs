//! Error types for the HSM crypto provider
//!
//! This module defines the error hierarchy for all provider operations.
//! Errors are grouped by what went wrong (decoding, unsupported request,
//! lookup, key mismatch, token failure, configuration) and use thiserror.

use thiserror::Error;

pub use crate::model::KeyTypeError;

/// Result type alias for provider operations
///
/// This is a convenience alias for `Result<T, HsmError>`.
pub type HsmResult<T> = Result<T, HsmError>;

/// Top-level error type for all provider operations
#[derive(Error, Debug)]
pub enum HsmError {
    /// Malformed key type string or parameter
    #[error("Key type error: {0}")]
    KeyType(#[from] KeyTypeError),

    /// Algorithm, hash or operation not implemented by this backend
    #[error("Unsupported: {0}")]
    Unsupported(#[from] UnsupportedError),

    /// Token lookup yielded no matching object
    #[error("Key lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Resolved key does not fit the requested operation
    #[error("Key mismatch: {0}")]
    KeyMismatch(#[from] KeyMismatchError),

    /// Failure reported by the token session
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Session configuration failure
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Requests this backend does not implement
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedError {
    /// Key type outside the supported enumeration
    #[error("unsupported key type {key_type}")]
    KeyType { key_type: String },

    /// Known algorithm this backend cannot generate or use
    #[error("algorithm not supported: {algorithm}")]
    Algorithm { algorithm: String },

    /// Hash algorithm other than SHA-256
    #[error("hash algorithm not supported: {algorithm}")]
    HashAlgorithm { algorithm: String },

    /// Contract operation this backend does not perform
    #[error("operation not supported: {operation}")]
    Operation { operation: &'static str },
}

/// Token lookups that found nothing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Key pair lookups require a non-empty CKA_ID
    #[error("key id must not be empty")]
    EmptyId,

    /// No private key with a matching public key was found
    #[error("no key pair found for id {key_id}")]
    KeyPairNotFound { key_id: String },

    /// No secret key was found
    #[error("no secret key found for id {key_id}")]
    SecretKeyNotFound { key_id: String },
}

/// The resolved key's representation does not match the operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyMismatchError {
    /// Symmetric keys have no exportable public half
    #[error("keys of type {kind} are not retrievable")]
    NotRetrievable { kind: String },

    /// Public key in a format this provider cannot handle
    #[error("key {key_id} has unsupported key format")]
    UnsupportedKeyFormat { key_id: String },

    /// Public key could not be serialized
    #[error("failed to encode public key: {reason}")]
    Encoding { reason: String },
}

/// Failures propagated from the token session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Session level failure
    #[error("session failure: {reason}")]
    Session { reason: String },

    /// Key generation failed on the token
    #[error("failed to generate key: {reason}")]
    Generation { reason: String },

    /// Signing failed on the token
    #[error("failed to sign: {reason}")]
    Signing { reason: String },

    /// Encryption or decryption failed on the token
    #[error("cipher operation failed: {reason}")]
    Cipher { reason: String },

    /// Random source failure
    #[error("random source failure: {reason}")]
    Random { reason: String },

    /// Random source returned fewer bytes than requested
    #[error("short read from random source: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Destination buffer cannot hold the output
    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Object attribute could not be read or interpreted
    #[error("failed to read attribute {attribute}: {reason}")]
    Attribute { attribute: String, reason: String },

    /// Object could not be destroyed
    #[error("failed to delete key: {reason}")]
    Delete { reason: String },
}

/// Session configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required setting is missing from the environment
    #[error("missing configuration variable {name}")]
    MissingVariable { name: &'static str },

    /// PKCS#11 module could not be loaded or initialized
    #[error("failed to load PKCS#11 module {path}: {reason}")]
    LibraryLoad { path: String, reason: String },

    /// No slot carries a token with the configured label
    #[error("no token with label {label}")]
    TokenNotFound { label: String },

    /// Opening the session or logging in failed
    #[error("failed to log in to token {label}: {reason}")]
    Login { label: String, reason: String },
}

/// Convert cryptoki errors raised outside a more specific context
impl From<cryptoki::error::Error> for HsmError {
    fn from(err: cryptoki::error::Error) -> Self {
        HsmError::Token(TokenError::Session {
            reason: err.to_string(),
        })
    }
}

impl HsmError {
    /// True when the error means "no such key" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HsmError::Lookup(LookupError::KeyPairNotFound { .. })
                | HsmError::Lookup(LookupError::SecretKeyNotFound { .. })
        )
    }
}
