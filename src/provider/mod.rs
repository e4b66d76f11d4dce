//! Crypto provider backed by a token session
//!
//! [`HsmCryptoProvider`] implements the host's [`CryptoProvider`] contract.
//! Generation requests are dispatched on the key type; every other key
//! operation resolves the key on the token by the identifier's id bytes and
//! works on the normalized [`PublicKey`] it carries.

mod generate;
mod verify;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::Rng;
use rsa::pkcs8::EncodePublicKey;
use rsa::traits::PublicKeyParts;
use tracing::{debug, error, info};

use crate::controller::HsmController;
use crate::error::{HsmResult, KeyMismatchError, TokenError, UnsupportedError};
use crate::model::key_type::encode;
use crate::model::{
    CryptoContext, CryptoFilter, CryptoHashParameter, CryptoIdentifier, CryptoKey,
    CryptoKeyParameter, CryptoKeySet, HashAlgorithm, KeyAlgorithm, KeyType, MajorKeyType,
    PublicKey,
};
use crate::ports::{CryptoProvider, KeyPair, RandomSource, SecretKey, TokenSession};

/// Namespace reported to the host
pub const HSM_NAMESPACE: &str = "luna-cloud-hsm";

/// Bounds of the random byte count behind a seed
const SEED_MIN_LEN: usize = 16;
const SEED_MAX_LEN: usize = 64;

pub struct HsmCryptoProvider<S: TokenSession> {
    controller: HsmController<S>,
}

impl<S: TokenSession> HsmCryptoProvider<S> {
    pub fn new(controller: HsmController<S>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &HsmController<S> {
        &self.controller
    }

    fn get_signer(&self, identifier: &CryptoIdentifier) -> HsmResult<S::KeyPair> {
        self.controller
            .api()
            .find_key_pair(identifier.id_bytes(), None)
    }

    fn get_secret_key(&self, identifier: &CryptoIdentifier) -> HsmResult<S::SecretKey> {
        self.controller.api().find_key(identifier.id_bytes(), None)
    }

    /// Raw public material and key type of a resolved key
    fn export(identifier: &CryptoIdentifier, public: &PublicKey) -> HsmResult<(Vec<u8>, KeyType)> {
        match public {
            PublicKey::Ecdsa(key) => Ok((
                key.to_bytes(),
                encode(MajorKeyType::Ecdsa, key.curve.name()),
            )),
            PublicKey::Rsa(key) => {
                let der = key
                    .to_public_key_der()
                    .map_err(|e| KeyMismatchError::Encoding {
                        reason: e.to_string(),
                    })?;
                let bits = key.size() * 8;
                Ok((
                    der.as_bytes().to_vec(),
                    encode(MajorKeyType::Rsa, &bits.to_string()),
                ))
            }
            PublicKey::Symmetric => Err(KeyMismatchError::NotRetrievable {
                kind: public.kind().to_string(),
            }
            .into()),
            PublicKey::Unknown(_) => Err(KeyMismatchError::UnsupportedKeyFormat {
                key_id: identifier.key_id.clone(),
            }
            .into()),
        }
    }
}

impl<S: TokenSession> CryptoProvider for HsmCryptoProvider<S> {
    fn create_crypto_context(&self, _context: &CryptoContext) -> HsmResult<()> {
        Ok(())
    }

    fn destroy_crypto_context(&self, _context: &CryptoContext) -> HsmResult<()> {
        Ok(())
    }

    fn is_crypto_context_existing(&self, _context: &CryptoContext) -> HsmResult<bool> {
        Ok(true)
    }

    fn get_namespaces(&self, _context: &CryptoContext) -> HsmResult<Vec<String>> {
        Ok(vec![HSM_NAMESPACE.to_string()])
    }

    fn generate_random(&self, _context: &CryptoContext, number: usize) -> HsmResult<Vec<u8>> {
        let reader = self.controller.api().new_random_reader()?;
        let mut buf = vec![0u8; number];
        let read = reader.read(&mut buf)?;
        if read < number {
            return Err(TokenError::ShortRead {
                expected: number,
                actual: read,
            }
            .into());
        }
        Ok(buf)
    }

    fn hash(&self, parameter: &CryptoHashParameter, msg: &[u8]) -> HsmResult<Vec<u8>> {
        match parameter.hash_algorithm {
            HashAlgorithm::Sha2256 => Ok(crate::model::sha256(msg).to_vec()),
            other => Err(UnsupportedError::HashAlgorithm {
                algorithm: other.to_string(),
            }
            .into()),
        }
    }

    fn encrypt(&self, identifier: &CryptoIdentifier, data: &[u8]) -> HsmResult<Vec<u8>> {
        let key = self.get_secret_key(identifier)?;
        let mut out = vec![0u8; key.ciphertext_len(data.len())];
        let written = key.encrypt(&mut out, data)?;
        out.truncate(written);
        debug!(key_id = %identifier.key_id, len = written, "Encrypted data");
        Ok(out)
    }

    fn decrypt(&self, identifier: &CryptoIdentifier, data: &[u8]) -> HsmResult<Vec<u8>> {
        let key = self.get_secret_key(identifier)?;
        let mut out = vec![0u8; key.plaintext_len(data.len())];
        let written = key.decrypt(&mut out, data)?;
        out.truncate(written);
        debug!(key_id = %identifier.key_id, len = written, "Decrypted data");
        Ok(out)
    }

    fn sign(&self, identifier: &CryptoIdentifier, data: &[u8]) -> HsmResult<Vec<u8>> {
        let signer = self.get_signer(identifier)?;
        let signature = signer.sign(
            self.controller.rand(),
            data,
            self.controller.signer_options(),
        )?;
        debug!(key_id = %identifier.key_id, kind = signer.public_key().kind(), "Signed data");
        Ok(signature)
    }

    fn verify(
        &self,
        identifier: &CryptoIdentifier,
        data: &[u8],
        signature: &[u8],
    ) -> HsmResult<bool> {
        let signer = self.get_signer(identifier)?;
        match signer.public_key() {
            PublicKey::Ecdsa(key) => verify::verify_ecdsa(key, data, signature),
            PublicKey::Rsa(key) => verify::verify_rsa(key, data, signature),
            public @ PublicKey::Symmetric => Err(KeyMismatchError::NotRetrievable {
                kind: public.kind().to_string(),
            }
            .into()),
            PublicKey::Unknown(_) => Err(KeyMismatchError::UnsupportedKeyFormat {
                key_id: identifier.key_id.clone(),
            }
            .into()),
        }
    }

    fn generate_key(&self, parameter: &CryptoKeyParameter) -> HsmResult<()> {
        let Some(algorithm) = KeyAlgorithm::from_key_type(&parameter.key_type) else {
            return Err(UnsupportedError::KeyType {
                key_type: parameter.key_type.to_string(),
            }
            .into());
        };
        match algorithm {
            KeyAlgorithm::Rsa2048 | KeyAlgorithm::Rsa3072 | KeyAlgorithm::Rsa4096 => {
                self.generate_rsa(parameter)?;
            }
            KeyAlgorithm::EcdsaP256 | KeyAlgorithm::EcdsaP384 | KeyAlgorithm::EcdsaP521 => {
                self.generate_ecdsa(parameter)?;
            }
            KeyAlgorithm::Aes256Gcm => {
                self.generate_aes(parameter)?;
            }
            KeyAlgorithm::Ed25519 => self.generate_eddsa(parameter)?,
        }
        info!(key_id = %parameter.identifier.key_id, key_type = %parameter.key_type, "Key generated");
        Ok(())
    }

    fn get_keys(&self, filter: &CryptoFilter) -> HsmResult<CryptoKeySet> {
        let key = self.get_key(&filter.identifier())?;
        Ok(CryptoKeySet { keys: vec![key] })
    }

    fn get_key(&self, identifier: &CryptoIdentifier) -> HsmResult<CryptoKey> {
        let signer = self.get_signer(identifier)?;
        let (key, key_type) = Self::export(identifier, signer.public_key())?;
        Ok(CryptoKey {
            key,
            parameter: CryptoKeyParameter {
                key_type,
                identifier: identifier.clone(),
            },
        })
    }

    fn is_key_existing(&self, identifier: &CryptoIdentifier) -> HsmResult<bool> {
        self.get_signer(identifier)?;
        Ok(true)
    }

    fn delete_key(&self, identifier: &CryptoIdentifier) -> HsmResult<()> {
        debug!(key_id = %identifier.key_id, "Key deletion is a no-op");
        Ok(())
    }

    fn rotate_key(&self, _identifier: &CryptoIdentifier) -> HsmResult<()> {
        Err(UnsupportedError::Operation {
            operation: "rotate_key",
        }
        .into())
    }

    fn get_seed(&self) -> String {
        let len = rand::rng().random_range(SEED_MIN_LEN..=SEED_MAX_LEN);
        match self.generate_random(&CryptoContext::default(), len) {
            Ok(random) => STANDARD.encode(random),
            Err(e) => {
                error!("Failed to generate seed: {}", e);
                String::new()
            }
        }
    }

    fn get_supported_keys_algs(&self) -> Vec<KeyType> {
        KeyAlgorithm::ALL.into_iter().map(KeyType::from).collect()
    }

    fn get_supported_hash_algs(&self) -> Vec<HashAlgorithm> {
        vec![HashAlgorithm::Sha2256]
    }
}
