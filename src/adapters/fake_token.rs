//! In-memory token session for tests
//!
//! Keeps real RSA and ECDSA (P-256, P-384, P-521) keys in a shared map and records every call it
//! receives, so tests can assert how (and whether) the provider reached the
//! token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::RngCore;
use rand_core::OsRng;
use rsa::pss::Pss;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::{HsmResult, LookupError, TokenError};
use crate::model::{EcdsaPublicKey, NamedCurve, PublicKey, RsaPadding, SignerOptions};
use crate::ports::{KeyPair, RandomSource, SecretKey, SymmetricCipher, TokenSession};

/// RSA keys are generated at this size regardless of the requested length,
/// the requested length is still recorded in [`TokenCall::GenerateRsa`].
const FAKE_RSA_BITS: usize = 1024;

const FAKE_CIPHER_MARKER: &[u8; 4] = b"FAKE";

/// A call received by [`FakeToken`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCall {
    GenerateRsa {
        id: Vec<u8>,
        label: Option<Vec<u8>>,
        bits: usize,
    },
    GenerateEcdsa {
        id: Vec<u8>,
        label: Option<Vec<u8>>,
        curve: NamedCurve,
    },
    GenerateSecret {
        id: Vec<u8>,
        label: Option<Vec<u8>>,
        bits: usize,
        cipher: SymmetricCipher,
    },
    FindKeyPair {
        id: Vec<u8>,
        label: Option<Vec<u8>>,
    },
    FindKey {
        id: Vec<u8>,
        label: Option<Vec<u8>>,
    },
    NewRandomReader,
}

/// Private half held by the fake
#[derive(Debug, Clone)]
pub enum FakePrivateKey {
    Rsa(RsaPrivateKey),
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    P521(ecdsa::SigningKey<p521::NistP521>),
    /// No usable private half, for odd public key representations
    Opaque,
}

impl FakePrivateKey {
    pub fn public_key(&self) -> PublicKey {
        match self {
            FakePrivateKey::Rsa(key) => PublicKey::Rsa(RsaPublicKey::from(key)),
            FakePrivateKey::P256(key) => PublicKey::Ecdsa(EcdsaPublicKey::new(
                NamedCurve::P256,
                key.verifying_key().to_encoded_point(false).as_bytes().to_vec(),
            )),
            FakePrivateKey::P384(key) => PublicKey::Ecdsa(EcdsaPublicKey::new(
                NamedCurve::P384,
                key.verifying_key().to_encoded_point(false).as_bytes().to_vec(),
            )),
            FakePrivateKey::P521(key) => PublicKey::Ecdsa(EcdsaPublicKey::new(
                NamedCurve::P521,
                key.verifying_key().to_encoded_point(false).as_bytes().to_vec(),
            )),
            FakePrivateKey::Opaque => PublicKey::Unknown("opaque".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct FakeKeyPairEntry {
    label: Option<Vec<u8>>,
    private: FakePrivateKey,
    public: PublicKey,
}

#[derive(Debug, Clone)]
struct FakeSecretEntry {
    label: Option<Vec<u8>>,
    key: [u8; 32],
}

#[derive(Debug, Default)]
struct FakeState {
    key_pairs: HashMap<Vec<u8>, FakeKeyPairEntry>,
    secrets: HashMap<Vec<u8>, FakeSecretEntry>,
    calls: Vec<TokenCall>,
    fail_random: bool,
    short_random: bool,
}

fn label_matches(stored: &Option<Vec<u8>>, wanted: Option<&[u8]>) -> bool {
    match wanted {
        Some(label) => stored.as_deref() == Some(label),
        None => true,
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeToken {
    state: Arc<Mutex<FakeState>>,
}

impl FakeToken {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake token state poisoned")
    }

    /// Place a key pair on the token
    pub fn insert_key_pair(&self, id: &[u8], private: FakePrivateKey) {
        let public = private.public_key();
        self.insert_key_pair_with_public(id, private, public);
    }

    /// Place a key pair whose public half is reported as `public`
    pub fn insert_key_pair_with_public(
        &self,
        id: &[u8],
        private: FakePrivateKey,
        public: PublicKey,
    ) {
        self.state().key_pairs.insert(
            id.to_vec(),
            FakeKeyPairEntry {
                label: None,
                private,
                public,
            },
        );
    }

    pub fn insert_secret_key(&self, id: &[u8], key: [u8; 32]) {
        self.state()
            .secrets
            .insert(id.to_vec(), FakeSecretEntry { label: None, key });
    }

    pub fn contains_key_pair(&self, id: &[u8]) -> bool {
        self.state().key_pairs.contains_key(id)
    }

    pub fn contains_secret_key(&self, id: &[u8]) -> bool {
        self.state().secrets.contains_key(id)
    }

    /// Calls received so far, oldest first
    pub fn calls(&self) -> Vec<TokenCall> {
        self.state().calls.clone()
    }

    /// Make `new_random_reader` fail
    pub fn fail_random(&self) {
        self.state().fail_random = true;
    }

    /// Make random readers return half of what was asked for
    pub fn short_random(&self) {
        self.state().short_random = true;
    }

    fn record(&self, call: TokenCall) {
        self.state().calls.push(call);
    }

    fn key_pair_handle(&self, id: &[u8], entry: &FakeKeyPairEntry) -> FakeKeyPair {
        FakeKeyPair {
            state: Arc::clone(&self.state),
            id: id.to_vec(),
            private: entry.private.clone(),
            public: entry.public.clone(),
        }
    }

    fn store_key_pair(
        &self,
        id: &[u8],
        label: Option<&[u8]>,
        private: FakePrivateKey,
    ) -> FakeKeyPair {
        let entry = FakeKeyPairEntry {
            label: label.map(<[u8]>::to_vec),
            public: private.public_key(),
            private,
        };
        let handle = self.key_pair_handle(id, &entry);
        self.state().key_pairs.insert(id.to_vec(), entry);
        handle
    }

    fn generate_rsa(&self, id: &[u8], label: Option<&[u8]>, bits: usize) -> HsmResult<FakeKeyPair> {
        self.record(TokenCall::GenerateRsa {
            id: id.to_vec(),
            label: label.map(<[u8]>::to_vec),
            bits,
        });
        let key = RsaPrivateKey::new(&mut OsRng, FAKE_RSA_BITS).map_err(|e| {
            TokenError::Generation {
                reason: e.to_string(),
            }
        })?;
        Ok(self.store_key_pair(id, label, FakePrivateKey::Rsa(key)))
    }

    fn generate_ecdsa(
        &self,
        id: &[u8],
        label: Option<&[u8]>,
        curve: NamedCurve,
    ) -> HsmResult<FakeKeyPair> {
        self.record(TokenCall::GenerateEcdsa {
            id: id.to_vec(),
            label: label.map(<[u8]>::to_vec),
            curve,
        });
        let private = match curve {
            NamedCurve::P256 => FakePrivateKey::P256(p256::ecdsa::SigningKey::random(&mut OsRng)),
            NamedCurve::P384 => FakePrivateKey::P384(p384::ecdsa::SigningKey::random(&mut OsRng)),
            NamedCurve::P521 => FakePrivateKey::P521(ecdsa::SigningKey::random(&mut OsRng)),
        };
        Ok(self.store_key_pair(id, label, private))
    }

    fn generate_secret(
        &self,
        id: &[u8],
        label: Option<&[u8]>,
        bits: usize,
        cipher: SymmetricCipher,
    ) -> HsmResult<FakeSecretKey> {
        self.record(TokenCall::GenerateSecret {
            id: id.to_vec(),
            label: label.map(<[u8]>::to_vec),
            bits,
            cipher,
        });
        let mut key = [0u8; 32];
        rand::rng().fill_bytes(&mut key);
        self.state().secrets.insert(
            id.to_vec(),
            FakeSecretEntry {
                label: label.map(<[u8]>::to_vec),
                key,
            },
        );
        Ok(FakeSecretKey { key })
    }
}

impl TokenSession for FakeToken {
    type KeyPair = FakeKeyPair;
    type SecretKey = FakeSecretKey;
    type Random = FakeRandom;

    fn generate_rsa_key_pair(&self, id: &[u8], bits: usize) -> HsmResult<FakeKeyPair> {
        self.generate_rsa(id, None, bits)
    }

    fn generate_rsa_key_pair_with_label(
        &self,
        id: &[u8],
        label: &[u8],
        bits: usize,
    ) -> HsmResult<FakeKeyPair> {
        self.generate_rsa(id, Some(label), bits)
    }

    fn generate_ecdsa_key_pair(&self, id: &[u8], curve: NamedCurve) -> HsmResult<FakeKeyPair> {
        self.generate_ecdsa(id, None, curve)
    }

    fn generate_ecdsa_key_pair_with_label(
        &self,
        id: &[u8],
        label: &[u8],
        curve: NamedCurve,
    ) -> HsmResult<FakeKeyPair> {
        self.generate_ecdsa(id, Some(label), curve)
    }

    fn generate_secret_key(
        &self,
        id: &[u8],
        bits: usize,
        cipher: SymmetricCipher,
    ) -> HsmResult<FakeSecretKey> {
        self.generate_secret(id, None, bits, cipher)
    }

    fn generate_secret_key_with_label(
        &self,
        id: &[u8],
        label: &[u8],
        bits: usize,
        cipher: SymmetricCipher,
    ) -> HsmResult<FakeSecretKey> {
        self.generate_secret(id, Some(label), bits, cipher)
    }

    fn find_key_pair(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<FakeKeyPair> {
        self.record(TokenCall::FindKeyPair {
            id: id.to_vec(),
            label: label.map(<[u8]>::to_vec),
        });
        if id.is_empty() {
            return Err(LookupError::EmptyId.into());
        }
        let entry = self
            .state()
            .key_pairs
            .get(id)
            .filter(|entry| label_matches(&entry.label, label))
            .cloned()
            .ok_or_else(|| LookupError::KeyPairNotFound {
                key_id: String::from_utf8_lossy(id).into_owned(),
            })?;
        Ok(self.key_pair_handle(id, &entry))
    }

    fn find_key_pairs(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<Vec<FakeKeyPair>> {
        if id.is_empty() && label.is_none() {
            return Err(LookupError::EmptyId.into());
        }
        let entries: Vec<(Vec<u8>, FakeKeyPairEntry)> = self
            .state()
            .key_pairs
            .iter()
            .filter(|(key_id, entry)| {
                (id.is_empty() || key_id.as_slice() == id) && label_matches(&entry.label, label)
            })
            .map(|(key_id, entry)| (key_id.clone(), entry.clone()))
            .collect();
        Ok(entries
            .iter()
            .map(|(key_id, entry)| self.key_pair_handle(key_id, entry))
            .collect())
    }

    fn find_all_key_pairs(&self) -> HsmResult<Vec<FakeKeyPair>> {
        let entries: Vec<(Vec<u8>, FakeKeyPairEntry)> = self
            .state()
            .key_pairs
            .iter()
            .map(|(key_id, entry)| (key_id.clone(), entry.clone()))
            .collect();
        Ok(entries
            .iter()
            .map(|(key_id, entry)| self.key_pair_handle(key_id, entry))
            .collect())
    }

    fn find_key(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<FakeSecretKey> {
        self.record(TokenCall::FindKey {
            id: id.to_vec(),
            label: label.map(<[u8]>::to_vec),
        });
        self.state()
            .secrets
            .get(id)
            .filter(|entry| label_matches(&entry.label, label))
            .map(|entry| FakeSecretKey { key: entry.key })
            .ok_or_else(|| {
                LookupError::SecretKeyNotFound {
                    key_id: String::from_utf8_lossy(id).into_owned(),
                }
                .into()
            })
    }

    fn find_keys(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<Vec<FakeSecretKey>> {
        if id.is_empty() && label.is_none() {
            return Err(LookupError::EmptyId.into());
        }
        Ok(self
            .state()
            .secrets
            .iter()
            .filter(|(key_id, entry)| {
                (id.is_empty() || key_id.as_slice() == id) && label_matches(&entry.label, label)
            })
            .map(|(_, entry)| FakeSecretKey { key: entry.key })
            .collect())
    }

    fn new_random_reader(&self) -> HsmResult<FakeRandom> {
        self.record(TokenCall::NewRandomReader);
        let state = self.state();
        if state.fail_random {
            return Err(TokenError::Random {
                reason: "random generator unavailable".to_string(),
            }
            .into());
        }
        Ok(FakeRandom {
            short: state.short_random,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FakeKeyPair {
    state: Arc<Mutex<FakeState>>,
    id: Vec<u8>,
    private: FakePrivateKey,
    public: PublicKey,
}

impl KeyPair for FakeKeyPair {
    fn sign(
        &self,
        _rand: &dyn RandomSource,
        data: &[u8],
        options: &SignerOptions,
    ) -> HsmResult<Vec<u8>> {
        use p256::ecdsa::signature::hazmat::PrehashSigner;

        let signing_failed = |reason: String| TokenError::Signing { reason };
        let signature = match &self.private {
            FakePrivateKey::P256(key) => {
                let signature: p256::ecdsa::Signature = key
                    .sign_prehash(data)
                    .map_err(|e| signing_failed(e.to_string()))?;
                signature.to_der().as_bytes().to_vec()
            }
            FakePrivateKey::P384(key) => {
                let signature: p384::ecdsa::Signature = key
                    .sign_prehash(data)
                    .map_err(|e| signing_failed(e.to_string()))?;
                signature.to_der().as_bytes().to_vec()
            }
            FakePrivateKey::P521(key) => {
                // short digests are taken as integers, left-pad them to the field size
                let mut padded = vec![0u8; 66usize.saturating_sub(data.len())];
                padded.extend_from_slice(data);
                let signature: ecdsa::Signature<p521::NistP521> = key
                    .sign_prehash(&padded)
                    .map_err(|e| signing_failed(e.to_string()))?;
                signature.to_der().as_bytes().to_vec()
            }
            FakePrivateKey::Rsa(key) => match options.rsa_padding {
                RsaPadding::Pss => key
                    .sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), data)
                    .map_err(|e| signing_failed(e.to_string()))?,
                RsaPadding::Pkcs1v15 => key
                    .sign(Pkcs1v15Sign::new::<Sha256>(), data)
                    .map_err(|e| signing_failed(e.to_string()))?,
            },
            FakePrivateKey::Opaque => {
                return Err(signing_failed("key cannot sign".to_string()).into());
            }
        };
        Ok(signature)
    }

    fn public_key(&self) -> &PublicKey {
        &self.public
    }

    fn delete(self) -> HsmResult<()> {
        let mut state = self.state.lock().expect("fake token state poisoned");
        state
            .key_pairs
            .remove(&self.id)
            .map(|_| ())
            .ok_or_else(|| {
                TokenError::Delete {
                    reason: "key pair already removed".to_string(),
                }
                .into()
            })
    }
}

/// Secret key whose "cipher" is a marker followed by the input XORed with the key
#[derive(Debug, Clone)]
pub struct FakeSecretKey {
    key: [u8; 32],
}

impl FakeSecretKey {
    fn apply(&self, dst: &mut [u8], src: &[u8]) {
        for (i, (out, byte)) in dst.iter_mut().zip(src).enumerate() {
            *out = byte ^ self.key[i % self.key.len()];
        }
    }
}

impl SecretKey for FakeSecretKey {
    fn ciphertext_len(&self, plaintext_len: usize) -> usize {
        FAKE_CIPHER_MARKER.len() + plaintext_len
    }

    fn plaintext_len(&self, ciphertext_len: usize) -> usize {
        ciphertext_len.saturating_sub(FAKE_CIPHER_MARKER.len())
    }

    fn encrypt(&self, dst: &mut [u8], src: &[u8]) -> HsmResult<usize> {
        let needed = self.ciphertext_len(src.len());
        if dst.len() < needed {
            return Err(TokenError::BufferTooSmall {
                needed,
                available: dst.len(),
            }
            .into());
        }
        let (marker, body) = dst.split_at_mut(FAKE_CIPHER_MARKER.len());
        marker.copy_from_slice(FAKE_CIPHER_MARKER);
        self.apply(body, src);
        Ok(needed)
    }

    fn decrypt(&self, dst: &mut [u8], src: &[u8]) -> HsmResult<usize> {
        let Some(body) = src.strip_prefix(FAKE_CIPHER_MARKER.as_slice()) else {
            return Err(TokenError::Cipher {
                reason: "not a fake ciphertext".to_string(),
            }
            .into());
        };
        if dst.len() < body.len() {
            return Err(TokenError::BufferTooSmall {
                needed: body.len(),
                available: dst.len(),
            }
            .into());
        }
        self.apply(dst, body);
        Ok(body.len())
    }
}

#[derive(Debug, Clone)]
pub struct FakeRandom {
    short: bool,
}

impl RandomSource for FakeRandom {
    fn read(&self, buf: &mut [u8]) -> HsmResult<usize> {
        let len = if self.short { buf.len() / 2 } else { buf.len() };
        rand::rng().fill_bytes(&mut buf[..len]);
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_tests_for;
    use crate::ports::contract_tests::token_contract;

    contract_tests_for!(
        fake_token_contract,
        make = FakeToken::new,
        tests = {
            test_generate_ecdsa_then_find => token_contract::test_generate_ecdsa_then_find,
            test_generate_with_label_then_find => token_contract::test_generate_with_label_then_find,
            test_find_missing_key_pair => token_contract::test_find_missing_key_pair,
            test_find_key_pair_empty_id => token_contract::test_find_key_pair_empty_id,
            test_find_key_pairs_and_all => token_contract::test_find_key_pairs_and_all,
            test_secret_key_round_trip => token_contract::test_secret_key_round_trip,
            test_find_missing_secret_key => token_contract::test_find_missing_secret_key,
            test_secret_key_rejects_small_buffer => token_contract::test_secret_key_rejects_small_buffer,
            test_random_reader_fills_buffer => token_contract::test_random_reader_fills_buffer,
            test_sign_ecdsa_is_der => token_contract::test_sign_ecdsa_is_der,
            test_delete_key_pair => token_contract::test_delete_key_pair,
        }
    );

    #[test]
    fn test_calls_are_recorded() {
        let token = FakeToken::new();
        let _ = token.find_key_pair(b"missing", None);
        token.generate_ecdsa_key_pair(b"k", NamedCurve::P384).unwrap();

        assert_eq!(
            token.calls(),
            vec![
                TokenCall::FindKeyPair {
                    id: b"missing".to_vec(),
                    label: None
                },
                TokenCall::GenerateEcdsa {
                    id: b"k".to_vec(),
                    label: None,
                    curve: NamedCurve::P384
                },
            ]
        );
    }

    #[test]
    fn test_short_random() {
        let token = FakeToken::new();
        token.short_random();
        let reader = token.new_random_reader().unwrap();
        let mut buf = [0u8; 10];
        assert_eq!(reader.read(&mut buf).unwrap(), 5);
    }
}
