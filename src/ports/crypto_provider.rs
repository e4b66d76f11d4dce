//! CryptoProvider trait - the generic provider contract of the host
//!
//! Hosts load providers as interchangeable backends through
//! [`CryptoProviderModule`] and talk to them only through [`CryptoProvider`].

use crate::error::HsmResult;
use crate::model::{
    CryptoContext, CryptoFilter, CryptoHashParameter, CryptoIdentifier, CryptoKey,
    CryptoKeyParameter, CryptoKeySet, HashAlgorithm, KeyType,
};

/// Algorithm-agnostic crypto provider
pub trait CryptoProvider: Send + Sync {
    fn create_crypto_context(&self, context: &CryptoContext) -> HsmResult<()>;

    fn destroy_crypto_context(&self, context: &CryptoContext) -> HsmResult<()>;

    fn is_crypto_context_existing(&self, context: &CryptoContext) -> HsmResult<bool>;

    fn get_namespaces(&self, context: &CryptoContext) -> HsmResult<Vec<String>>;

    /// Produce `number` random bytes
    fn generate_random(&self, context: &CryptoContext, number: usize) -> HsmResult<Vec<u8>>;

    fn hash(&self, parameter: &CryptoHashParameter, msg: &[u8]) -> HsmResult<Vec<u8>>;

    fn encrypt(&self, identifier: &CryptoIdentifier, data: &[u8]) -> HsmResult<Vec<u8>>;

    fn decrypt(&self, identifier: &CryptoIdentifier, data: &[u8]) -> HsmResult<Vec<u8>>;

    fn sign(&self, identifier: &CryptoIdentifier, data: &[u8]) -> HsmResult<Vec<u8>>;

    fn verify(
        &self,
        identifier: &CryptoIdentifier,
        data: &[u8],
        signature: &[u8],
    ) -> HsmResult<bool>;

    /// Create a key on the backend; no key material is returned
    fn generate_key(&self, parameter: &CryptoKeyParameter) -> HsmResult<()>;

    fn get_keys(&self, filter: &CryptoFilter) -> HsmResult<CryptoKeySet>;

    fn get_key(&self, identifier: &CryptoIdentifier) -> HsmResult<CryptoKey>;

    fn is_key_existing(&self, identifier: &CryptoIdentifier) -> HsmResult<bool>;

    fn delete_key(&self, identifier: &CryptoIdentifier) -> HsmResult<()>;

    fn rotate_key(&self, identifier: &CryptoIdentifier) -> HsmResult<()>;

    /// Opportunistic seed material, empty on failure
    fn get_seed(&self) -> String;

    fn get_supported_keys_algs(&self) -> Vec<KeyType>;

    fn get_supported_hash_algs(&self) -> Vec<HashAlgorithm>;
}

/// Factory the host resolves to obtain a provider
pub trait CryptoProviderModule {
    /// Build a ready-to-use provider
    ///
    /// # Errors
    ///
    /// Configuration and session failures abort initialization
    fn crypto_provider(&self) -> HsmResult<Box<dyn CryptoProvider>>;
}
