//! Local signature verification against exported public keys
//!
//! The data is hashed with SHA-256 before verification. A signature that does
//! not parse or does not match is a negative result, not an error.

use ecdsa::signature::hazmat::PrehashVerifier;
use rsa::pss::Pss;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use sha2::Sha256;
use tracing::debug;

use crate::error::{HsmResult, KeyMismatchError};
use crate::model::{sha256, EcdsaPublicKey, NamedCurve};

const SHA256_LEN: usize = 32;

fn point_error(e: ecdsa::Error) -> KeyMismatchError {
    KeyMismatchError::Encoding {
        reason: format!("invalid ECDSA public point: {e}"),
    }
}

/// Verify an ASN.1 DER ECDSA signature over `data`
pub(crate) fn verify_ecdsa(
    key: &EcdsaPublicKey,
    data: &[u8],
    signature: &[u8],
) -> HsmResult<bool> {
    let digest = sha256(data);
    let valid = match key.curve {
        NamedCurve::P256 => {
            let verifying_key =
                p256::ecdsa::VerifyingKey::from_sec1_bytes(&key.point).map_err(point_error)?;
            match p256::ecdsa::Signature::from_der(signature) {
                Ok(signature) => verifying_key.verify_prehash(&digest, &signature).is_ok(),
                Err(_) => false,
            }
        }
        NamedCurve::P384 => {
            let verifying_key =
                p384::ecdsa::VerifyingKey::from_sec1_bytes(&key.point).map_err(point_error)?;
            match p384::ecdsa::Signature::from_der(signature) {
                Ok(signature) => verifying_key.verify_prehash(&digest, &signature).is_ok(),
                Err(_) => false,
            }
        }
        NamedCurve::P521 => {
            let verifying_key = ecdsa::VerifyingKey::<p521::NistP521>::from_sec1_bytes(&key.point)
                .map_err(point_error)?;
            // prehashes shorter than half the field are rejected, pad to the field size
            let mut prehash = [0u8; 66];
            prehash[66 - digest.len()..].copy_from_slice(&digest);
            match ecdsa::Signature::<p521::NistP521>::from_der(signature) {
                Ok(signature) => verifying_key.verify_prehash(&prehash, &signature).is_ok(),
                Err(_) => false,
            }
        }
    };
    debug!(curve = %key.curve, valid, "Verified ECDSA signature");
    Ok(valid)
}

/// Largest PSS salt a key of `key_bits` can carry with a SHA-256 digest
fn max_pss_salt_len(key_bits: usize) -> usize {
    let em_len = key_bits.saturating_sub(1).div_ceil(8);
    em_len.saturating_sub(SHA256_LEN + 2)
}

/// Verify an RSA-PSS signature over `data`
///
/// The salt length is not fixed: the digest-length salt is tried first, then
/// every other length the key allows.
pub(crate) fn verify_rsa(key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> HsmResult<bool> {
    let digest = sha256(data);
    let max_salt = max_pss_salt_len(key.n().bits());
    let salt_len = std::iter::once(SHA256_LEN)
        .chain((0..=max_salt).filter(|len| *len != SHA256_LEN))
        .find(|len| {
            key.verify(Pss::new_with_salt::<Sha256>(*len), &digest, signature)
                .is_ok()
        });
    let valid = salt_len.is_some();
    debug!(valid, ?salt_len, "Verified RSA-PSS signature");
    Ok(valid)
}
