//! TokenSession trait - key generation and lookup on an authenticated token

use crate::error::HsmResult;
use crate::model::NamedCurve;
use crate::ports::{KeyPair, RandomSource, SecretKey};

/// Symmetric ciphers the token can generate keys for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymmetricCipher {
    Aes,
}

/// Capability to create and locate keys on an already authenticated token
///
/// Ids are raw CKA_ID bytes and labels raw CKA_LABEL bytes. Implementations
/// are responsible for their own thread-safety; callers add no locking.
pub trait TokenSession: Send + Sync {
    /// Asymmetric key pair handle
    type KeyPair: KeyPair;
    /// Symmetric key handle
    type SecretKey: SecretKey;
    /// Token-bound random source
    type Random: RandomSource;

    /// Generate an RSA key pair with public exponent 65537
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Generation` if the token rejects the request
    fn generate_rsa_key_pair(&self, id: &[u8], bits: usize) -> HsmResult<Self::KeyPair>;

    fn generate_rsa_key_pair_with_label(
        &self,
        id: &[u8],
        label: &[u8],
        bits: usize,
    ) -> HsmResult<Self::KeyPair>;

    /// Generate an ECDSA key pair on the given curve
    fn generate_ecdsa_key_pair(&self, id: &[u8], curve: NamedCurve) -> HsmResult<Self::KeyPair>;

    fn generate_ecdsa_key_pair_with_label(
        &self,
        id: &[u8],
        label: &[u8],
        curve: NamedCurve,
    ) -> HsmResult<Self::KeyPair>;

    /// Generate a secret key of `bits` length for `cipher`
    fn generate_secret_key(
        &self,
        id: &[u8],
        bits: usize,
        cipher: SymmetricCipher,
    ) -> HsmResult<Self::SecretKey>;

    fn generate_secret_key_with_label(
        &self,
        id: &[u8],
        label: &[u8],
        bits: usize,
        cipher: SymmetricCipher,
    ) -> HsmResult<Self::SecretKey>;

    /// Find a previously created key pair
    ///
    /// Only private keys with a non-empty id are found, and only when a
    /// public key with the same id exists as well.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::EmptyId` for an empty id and
    /// `LookupError::KeyPairNotFound` when nothing matches
    fn find_key_pair(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<Self::KeyPair>;

    /// Find all key pairs matching id and label, empty if none
    fn find_key_pairs(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<Vec<Self::KeyPair>>;

    /// Find every key pair on the token
    fn find_all_key_pairs(&self) -> HsmResult<Vec<Self::KeyPair>>;

    /// Find a previously created secret key
    ///
    /// # Errors
    ///
    /// Returns `LookupError::SecretKeyNotFound` when nothing matches
    fn find_key(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<Self::SecretKey>;

    /// Find all secret keys matching id and label, empty if none
    fn find_keys(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<Vec<Self::SecretKey>>;

    /// Random source backed by the token's generator
    fn new_random_reader(&self) -> HsmResult<Self::Random>;
}
