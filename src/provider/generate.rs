//! Key generation per algorithm family

use tracing::{debug, warn};

use crate::error::{HsmResult, UnsupportedError};
use crate::model::key_type::decode;
use crate::model::{CryptoKeyParameter, KeyAlgorithm, KeyTypeError, MajorKeyType, NamedCurve};
use crate::ports::{SymmetricCipher, TokenSession};

use super::HsmCryptoProvider;

const AES_KEY_BITS: usize = 256;

/// Decode the key type and make sure it belongs to `expected`
fn decode_family(
    parameter: &CryptoKeyParameter,
    expected: MajorKeyType,
) -> HsmResult<String> {
    let (family, value) = decode(&parameter.key_type)?;
    if family != expected {
        return Err(KeyTypeError::FamilyMismatch {
            expected,
            actual: family,
        }
        .into());
    }
    Ok(value)
}

impl<S: TokenSession> HsmCryptoProvider<S> {
    pub(crate) fn generate_rsa(&self, parameter: &CryptoKeyParameter) -> HsmResult<S::KeyPair> {
        let value = decode_family(parameter, MajorKeyType::Rsa)?;
        let bits = value
            .parse::<usize>()
            .map_err(|source| KeyTypeError::InvalidBitLength {
                parameter: value.clone(),
                source,
            })?;
        debug!(key_id = %parameter.identifier.key_id, bits, "Generating RSA key");
        self.controller()
            .api()
            .generate_rsa_key_pair(parameter.identifier.id_bytes(), bits)
    }

    pub(crate) fn generate_ecdsa(&self, parameter: &CryptoKeyParameter) -> HsmResult<S::KeyPair> {
        let value = decode_family(parameter, MajorKeyType::Ecdsa)?;
        let curve = NamedCurve::from_parameter(&value)?;
        debug!(key_id = %parameter.identifier.key_id, %curve, "Generating ECDSA key");
        self.controller()
            .api()
            .generate_ecdsa_key_pair(parameter.identifier.id_bytes(), curve)
    }

    pub(crate) fn generate_aes(&self, parameter: &CryptoKeyParameter) -> HsmResult<S::SecretKey> {
        if KeyAlgorithm::from_key_type(&parameter.key_type) != Some(KeyAlgorithm::Aes256Gcm) {
            return Err(UnsupportedError::Algorithm {
                algorithm: parameter.key_type.to_string(),
            }
            .into());
        }
        debug!(key_id = %parameter.identifier.key_id, "Generating AES key");
        self.controller().api().generate_secret_key(
            parameter.identifier.id_bytes(),
            AES_KEY_BITS,
            SymmetricCipher::Aes,
        )
    }

    pub(crate) fn generate_eddsa(&self, parameter: &CryptoKeyParameter) -> HsmResult<()> {
        warn!(key_id = %parameter.identifier.key_id, "Ed25519 keys are not supported by the token");
        Err(UnsupportedError::Algorithm {
            algorithm: KeyAlgorithm::Ed25519.to_string(),
        }
        .into())
    }
}
