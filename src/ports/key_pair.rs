//! KeyPair trait - capability of an asymmetric token key

use crate::error::HsmResult;
use crate::model::{PublicKey, SignerOptions};
use crate::ports::RandomSource;

/// Asymmetric key pair held by the token
pub trait KeyPair: Send + Sync {
    /// Sign `data` as given, without hashing it first
    ///
    /// # Arguments
    ///
    /// * `rand` - Randomness for schemes that need it
    /// * `data` - The data (usually a digest) to sign
    /// * `options` - Digest and padding the token should assume
    ///
    /// # Returns
    ///
    /// The signature bytes; ECDSA signatures are ASN.1 DER encoded
    fn sign(
        &self,
        rand: &dyn RandomSource,
        data: &[u8],
        options: &SignerOptions,
    ) -> HsmResult<Vec<u8>>;

    /// Public half in normalized form
    fn public_key(&self) -> &PublicKey;

    /// Destroy both halves on the token
    fn delete(self) -> HsmResult<()>
    where
        Self: Sized;
}
