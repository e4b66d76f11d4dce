//! SecretKey trait - capability of a symmetric token key

use crate::error::HsmResult;

/// Symmetric key held by the token
///
/// Output buffers are sized by the caller from `ciphertext_len` and
/// `plaintext_len`; encrypt and decrypt return the number of bytes written.
pub trait SecretKey: Send + Sync {
    /// Upper bound of the ciphertext length for `plaintext_len` input bytes
    fn ciphertext_len(&self, plaintext_len: usize) -> usize;

    /// Upper bound of the plaintext length for `ciphertext_len` input bytes
    fn plaintext_len(&self, ciphertext_len: usize) -> usize;

    /// # Errors
    ///
    /// Returns `TokenError::BufferTooSmall` if `dst` cannot hold the output
    fn encrypt(&self, dst: &mut [u8], src: &[u8]) -> HsmResult<usize>;

    /// # Errors
    ///
    /// Returns `TokenError::BufferTooSmall` if `dst` cannot hold the output
    fn decrypt(&self, dst: &mut [u8], src: &[u8]) -> HsmResult<usize>;
}
