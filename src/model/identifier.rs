//! Key identifiers and key descriptions of the host contract

use regex::Regex;

use super::{HashAlgorithm, KeyType};

/// Opaque namespace tag supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CryptoContext {
    pub namespace: String,
    pub group: String,
    pub engine: String,
}

impl CryptoContext {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }
}

/// Identifies a key uniquely within a namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CryptoIdentifier {
    pub key_id: String,
    pub crypto_context: CryptoContext,
}

impl CryptoIdentifier {
    pub fn new(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            crypto_context: CryptoContext::default(),
        }
    }

    /// Bytes used as CKA_ID on the token
    pub fn id_bytes(&self) -> &[u8] {
        self.key_id.as_bytes()
    }
}

/// Describes a key to be generated or one that was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoKeyParameter {
    pub key_type: KeyType,
    pub identifier: CryptoIdentifier,
}

/// Public material of a key together with its description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoKey {
    pub key: Vec<u8>,
    pub parameter: CryptoKeyParameter,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CryptoKeySet {
    pub keys: Vec<CryptoKey>,
}

/// Key query of the host contract
///
/// Only `id` and `crypto_context` are honoured by this backend; `filter` is
/// accepted for contract compatibility.
#[derive(Debug, Clone, Default)]
pub struct CryptoFilter {
    pub id: String,
    pub crypto_context: CryptoContext,
    pub filter: Option<Regex>,
}

impl CryptoFilter {
    pub fn identifier(&self) -> CryptoIdentifier {
        CryptoIdentifier {
            key_id: self.id.clone(),
            crypto_context: self.crypto_context.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoHashParameter {
    pub identifier: CryptoIdentifier,
    pub hash_algorithm: HashAlgorithm,
}

impl CryptoHashParameter {
    pub fn new(hash_algorithm: HashAlgorithm) -> Self {
        Self {
            identifier: CryptoIdentifier::default(),
            hash_algorithm,
        }
    }
}
