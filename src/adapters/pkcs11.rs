//! PKCS#11 implementation of the token session port
//!
//! This module provides concrete implementations of the port traits on top
//! of a single authenticated `cryptoki` session. Key pairs are located by
//! CKA_ID (and optionally CKA_LABEL); their public halves are read once and
//! normalized into [`PublicKey`].

use std::sync::{Arc, Mutex, MutexGuard};

use cryptoki::context::{CInitializeArgs, Pkcs11};
use cryptoki::mechanism::rsa::{PkcsMgfType, PkcsPssParams};
use cryptoki::mechanism::{aead::GcmParams, Mechanism, MechanismType};
use cryptoki::object::{Attribute, AttributeType, KeyType, ObjectClass, ObjectHandle};
use cryptoki::session::{Session, UserType};
use cryptoki::slot::Slot;
use cryptoki::types::{AuthPin, Ulong};
use der::asn1::OctetString;
use der::Decode;
use rsa::{BigUint, RsaPublicKey};
use secrecy::ExposeSecret;
use tracing::{debug, info, trace, warn};

use crate::config::HsmConfig;
use crate::error::{ConfigError, HsmError, HsmResult, LookupError, TokenError};
use crate::model::{
    EcdsaPublicKey, HashAlgorithm, NamedCurve, PublicKey, RsaPadding, SignerOptions,
};
use crate::ports::{KeyPair, RandomSource, SecretKey, SymmetricCipher, TokenSession};

const RSA_PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

const GCM_IV_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;

/// DER prefix of a PKCS#1 v1.5 DigestInfo, followed by the digest itself
fn digest_info_prefix(digest: HashAlgorithm) -> &'static [u8] {
    match digest {
        HashAlgorithm::Sha2256 => &[
            0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x01, 0x05, 0x00, 0x04, 0x20,
        ],
        HashAlgorithm::Sha2384 => &[
            0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x02, 0x05, 0x00, 0x04, 0x30,
        ],
        HashAlgorithm::Sha2512 => &[
            0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x03, 0x05, 0x00, 0x04, 0x40,
        ],
    }
}

fn pss_params(digest: HashAlgorithm) -> PkcsPssParams {
    let (hash_alg, mgf) = match digest {
        HashAlgorithm::Sha2256 => (MechanismType::SHA256, PkcsMgfType::MGF1_SHA256),
        HashAlgorithm::Sha2384 => (MechanismType::SHA384, PkcsMgfType::MGF1_SHA384),
        HashAlgorithm::Sha2512 => (MechanismType::SHA512, PkcsMgfType::MGF1_SHA512),
    };
    PkcsPssParams {
        hash_alg,
        mgf,
        s_len: Ulong::from(digest.output_len() as u64),
    }
}

/// CKA_EC_POINT is a DER OCTET STRING around the SEC1 point, though some
/// modules hand back the bare point
fn unwrap_ec_point(curve: NamedCurve, value: &[u8]) -> HsmResult<Vec<u8>> {
    let uncompressed_len = 2 * curve.field_len() + 1;
    if value.len() == uncompressed_len && value[0] == 0x04 {
        return Ok(value.to_vec());
    }
    let octets = OctetString::from_der(value).map_err(|e| TokenError::Attribute {
        attribute: "CKA_EC_POINT".to_string(),
        reason: e.to_string(),
    })?;
    Ok(octets.as_bytes().to_vec())
}

/// Tokens return ECDSA signatures as raw `r || s`
fn raw_ecdsa_to_der(curve: NamedCurve, raw: &[u8]) -> HsmResult<Vec<u8>> {
    let invalid = |e: ecdsa::Error| TokenError::Signing {
        reason: format!("invalid {curve} signature from token: {e}"),
    };
    let der = match curve {
        NamedCurve::P256 => p256::ecdsa::Signature::from_slice(raw)
            .map_err(invalid)?
            .to_der()
            .as_bytes()
            .to_vec(),
        NamedCurve::P384 => p384::ecdsa::Signature::from_slice(raw)
            .map_err(invalid)?
            .to_der()
            .as_bytes()
            .to_vec(),
        NamedCurve::P521 => p521::ecdsa::Signature::from_slice(raw)
            .map_err(invalid)?
            .to_der()
            .as_bytes()
            .to_vec(),
    };
    Ok(der)
}

fn key_id_string(id: &[u8]) -> String {
    String::from_utf8_lossy(id).into_owned()
}

fn attribute_error(attribute: &str, reason: impl ToString) -> HsmError {
    TokenError::Attribute {
        attribute: attribute.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

struct TokenInner {
    // Keeps the module loaded for as long as any handle lives
    _pkcs11: Pkcs11,
    session: Mutex<Session>,
}

impl TokenInner {
    fn session(&self) -> HsmResult<MutexGuard<'_, Session>> {
        self.session.lock().map_err(|_| {
            TokenError::Session {
                reason: "session lock poisoned".to_string(),
            }
            .into()
        })
    }
}

/// Authenticated session on a PKCS#11 token
///
/// Cloning is cheap; clones share the one underlying session, which is
/// serialized behind a mutex.
#[derive(Clone)]
pub struct Pkcs11Token {
    inner: Arc<TokenInner>,
    label: String,
}

impl std::fmt::Debug for Pkcs11Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkcs11Token")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Pkcs11Token {
    /// Load the module, find the token by label and log in as user
    ///
    /// # Errors
    ///
    /// * `ConfigError::LibraryLoad` - the module cannot be loaded or initialized
    /// * `ConfigError::TokenNotFound` - no slot holds a token with the label
    /// * `ConfigError::Login` - the PIN is rejected
    pub fn open(config: &HsmConfig) -> HsmResult<Self> {
        let path = config.module_path.display().to_string();
        info!(module = %path, token = %config.token_label, "Opening PKCS#11 token session");

        let library_error = |e: cryptoki::error::Error| ConfigError::LibraryLoad {
            path: path.clone(),
            reason: e.to_string(),
        };
        let pkcs11 = Pkcs11::new(&config.module_path).map_err(library_error)?;
        pkcs11
            .initialize(CInitializeArgs::OsThreads)
            .map_err(library_error)?;

        let slot = Self::find_slot(&pkcs11, &config.token_label)?;
        let session = pkcs11.open_rw_session(slot)?;

        let pin = AuthPin::new(config.pin.expose_secret().clone());
        session
            .login(UserType::User, Some(&pin))
            .map_err(|e| ConfigError::Login {
                label: config.token_label.clone(),
                reason: e.to_string(),
            })?;

        info!(token = %config.token_label, "Logged into token");
        Ok(Self {
            inner: Arc::new(TokenInner {
                _pkcs11: pkcs11,
                session: Mutex::new(session),
            }),
            label: config.token_label.clone(),
        })
    }

    fn find_slot(pkcs11: &Pkcs11, label: &str) -> HsmResult<Slot> {
        let slots = pkcs11.get_slots_with_token()?;
        for slot in slots {
            match pkcs11.get_token_info(slot) {
                Ok(info) if info.label().trim_end() == label => {
                    debug!(slot = slot.id(), "Found token slot");
                    return Ok(slot);
                }
                Ok(_) => {}
                Err(e) => warn!(slot = slot.id(), "Failed to read token info: {}", e),
            }
        }
        Err(ConfigError::TokenNotFound {
            label: label.to_string(),
        }
        .into())
    }

    fn search_template(class: ObjectClass, id: &[u8], label: Option<&[u8]>) -> Vec<Attribute> {
        let mut template = vec![Attribute::Class(class)];
        if !id.is_empty() {
            template.push(Attribute::Id(id.to_vec()));
        }
        if let Some(label) = label {
            template.push(Attribute::Label(label.to_vec()));
        }
        template
    }

    fn generate_rsa(
        &self,
        id: &[u8],
        label: Option<&[u8]>,
        bits: usize,
    ) -> HsmResult<Pkcs11KeyPair> {
        debug!(key_id = %key_id_string(id), bits, "Generating RSA key pair");
        let mut public_template = vec![
            Attribute::Class(ObjectClass::PUBLIC_KEY),
            Attribute::KeyType(KeyType::RSA),
            Attribute::Token(true),
            Attribute::Verify(true),
            Attribute::Id(id.to_vec()),
            Attribute::ModulusBits(Ulong::from(bits as u64)),
            Attribute::PublicExponent(RSA_PUBLIC_EXPONENT.to_vec()),
        ];
        let mut private_template = vec![
            Attribute::Class(ObjectClass::PRIVATE_KEY),
            Attribute::KeyType(KeyType::RSA),
            Attribute::Token(true),
            Attribute::Private(true),
            Attribute::Sensitive(true),
            Attribute::Extractable(false),
            Attribute::Sign(true),
            Attribute::Id(id.to_vec()),
        ];
        if let Some(label) = label {
            public_template.push(Attribute::Label(label.to_vec()));
            private_template.push(Attribute::Label(label.to_vec()));
        }
        self.generate_key_pair(
            id,
            &Mechanism::RsaPkcsKeyPairGen,
            &public_template,
            &private_template,
        )
    }

    fn generate_ecdsa(
        &self,
        id: &[u8],
        label: Option<&[u8]>,
        curve: NamedCurve,
    ) -> HsmResult<Pkcs11KeyPair> {
        debug!(key_id = %key_id_string(id), %curve, "Generating ECDSA key pair");
        let ec_params = curve.to_ec_params().map_err(|e| TokenError::Generation {
            reason: format!("failed to encode curve {curve}: {e}"),
        })?;
        let mut public_template = vec![
            Attribute::Class(ObjectClass::PUBLIC_KEY),
            Attribute::KeyType(KeyType::EC),
            Attribute::Token(true),
            Attribute::Verify(true),
            Attribute::Id(id.to_vec()),
            Attribute::EcParams(ec_params),
        ];
        let mut private_template = vec![
            Attribute::Class(ObjectClass::PRIVATE_KEY),
            Attribute::KeyType(KeyType::EC),
            Attribute::Token(true),
            Attribute::Private(true),
            Attribute::Sensitive(true),
            Attribute::Extractable(false),
            Attribute::Sign(true),
            Attribute::Id(id.to_vec()),
        ];
        if let Some(label) = label {
            public_template.push(Attribute::Label(label.to_vec()));
            private_template.push(Attribute::Label(label.to_vec()));
        }
        self.generate_key_pair(
            id,
            &Mechanism::EccKeyPairGen,
            &public_template,
            &private_template,
        )
    }

    fn generate_key_pair(
        &self,
        id: &[u8],
        mechanism: &Mechanism,
        public_template: &[Attribute],
        private_template: &[Attribute],
    ) -> HsmResult<Pkcs11KeyPair> {
        let session = self.inner.session()?;
        let (public_handle, private_handle) = session
            .generate_key_pair(mechanism, public_template, private_template)
            .map_err(|e| TokenError::Generation {
                reason: e.to_string(),
            })?;
        trace!(?public_handle, ?private_handle, "Generated key pair");
        let public = read_public_key(&session, public_handle)?;
        info!(key_id = %key_id_string(id), kind = public.kind(), "Key pair generated");
        Ok(Pkcs11KeyPair {
            inner: Arc::clone(&self.inner),
            private_handle,
            public_handle,
            public,
        })
    }

    fn generate_secret(
        &self,
        id: &[u8],
        label: Option<&[u8]>,
        bits: usize,
        cipher: SymmetricCipher,
    ) -> HsmResult<Pkcs11SecretKey> {
        debug!(key_id = %key_id_string(id), bits, ?cipher, "Generating secret key");
        let (mechanism, key_type) = match cipher {
            SymmetricCipher::Aes => (Mechanism::AesKeyGen, KeyType::AES),
        };
        let mut template = vec![
            Attribute::Class(ObjectClass::SECRET_KEY),
            Attribute::KeyType(key_type),
            Attribute::Token(true),
            Attribute::Private(true),
            Attribute::Sensitive(true),
            Attribute::Extractable(false),
            Attribute::Encrypt(true),
            Attribute::Decrypt(true),
            Attribute::ValueLen(Ulong::from((bits / 8) as u64)),
            Attribute::Id(id.to_vec()),
        ];
        if let Some(label) = label {
            template.push(Attribute::Label(label.to_vec()));
        }
        let session = self.inner.session()?;
        let handle = session
            .generate_key(&mechanism, &template)
            .map_err(|e| TokenError::Generation {
                reason: e.to_string(),
            })?;
        info!(key_id = %key_id_string(id), "Secret key generated");
        Ok(Pkcs11SecretKey {
            inner: Arc::clone(&self.inner),
            handle,
        })
    }

    /// Pair every matching private key with its public key of the same id
    fn collect_key_pairs(&self, template: &[Attribute]) -> HsmResult<Vec<Pkcs11KeyPair>> {
        let session = self.inner.session()?;
        let private_handles = session.find_objects(template)?;

        let mut key_pairs = Vec::with_capacity(private_handles.len());
        for private_handle in private_handles {
            let id = read_id(&session, private_handle)?;
            if id.is_empty() {
                continue;
            }
            let public_template = [
                Attribute::Class(ObjectClass::PUBLIC_KEY),
                Attribute::Id(id.clone()),
            ];
            let public_handles = session.find_objects(&public_template)?;
            let Some(&public_handle) = public_handles.first() else {
                debug!(key_id = %key_id_string(&id), "Private key without public key, skipping");
                continue;
            };
            let public = read_public_key(&session, public_handle)?;
            key_pairs.push(Pkcs11KeyPair {
                inner: Arc::clone(&self.inner),
                private_handle,
                public_handle,
                public,
            });
        }
        Ok(key_pairs)
    }

    fn collect_secret_keys(&self, template: &[Attribute]) -> HsmResult<Vec<Pkcs11SecretKey>> {
        let session = self.inner.session()?;
        let handles = session.find_objects(template)?;
        Ok(handles
            .into_iter()
            .map(|handle| Pkcs11SecretKey {
                inner: Arc::clone(&self.inner),
                handle,
            })
            .collect())
    }
}

fn read_id(session: &Session, handle: ObjectHandle) -> HsmResult<Vec<u8>> {
    let attributes = session
        .get_attributes(handle, &[AttributeType::Id])
        .map_err(|e| attribute_error("CKA_ID", e))?;
    Ok(attributes
        .into_iter()
        .find_map(|attribute| match attribute {
            Attribute::Id(id) => Some(id),
            _ => None,
        })
        .unwrap_or_default())
}

fn read_public_key(session: &Session, handle: ObjectHandle) -> HsmResult<PublicKey> {
    let attributes = session
        .get_attributes(handle, &[AttributeType::KeyType])
        .map_err(|e| attribute_error("CKA_KEY_TYPE", e))?;
    let key_type = attributes
        .into_iter()
        .find_map(|attribute| match attribute {
            Attribute::KeyType(key_type) => Some(key_type),
            _ => None,
        })
        .ok_or_else(|| attribute_error("CKA_KEY_TYPE", "not present"))?;

    if key_type == KeyType::RSA {
        read_rsa_public_key(session, handle)
    } else if key_type == KeyType::EC {
        read_ec_public_key(session, handle)
    } else {
        Ok(PublicKey::Unknown(format!("{key_type:?}")))
    }
}

fn read_rsa_public_key(session: &Session, handle: ObjectHandle) -> HsmResult<PublicKey> {
    let attributes = session
        .get_attributes(
            handle,
            &[AttributeType::Modulus, AttributeType::PublicExponent],
        )
        .map_err(|e| attribute_error("CKA_MODULUS", e))?;

    let mut modulus = None;
    let mut exponent = None;
    for attribute in attributes {
        match attribute {
            Attribute::Modulus(n) => modulus = Some(n),
            Attribute::PublicExponent(e) => exponent = Some(e),
            _ => {}
        }
    }
    let modulus = modulus.ok_or_else(|| attribute_error("CKA_MODULUS", "not present"))?;
    let exponent =
        exponent.ok_or_else(|| attribute_error("CKA_PUBLIC_EXPONENT", "not present"))?;

    let key = RsaPublicKey::new(
        BigUint::from_bytes_be(&modulus),
        BigUint::from_bytes_be(&exponent),
    )
    .map_err(|e| attribute_error("CKA_MODULUS", e))?;
    Ok(PublicKey::Rsa(key))
}

fn read_ec_public_key(session: &Session, handle: ObjectHandle) -> HsmResult<PublicKey> {
    let attributes = session
        .get_attributes(handle, &[AttributeType::EcParams, AttributeType::EcPoint])
        .map_err(|e| attribute_error("CKA_EC_POINT", e))?;

    let mut params = None;
    let mut point = None;
    for attribute in attributes {
        match attribute {
            Attribute::EcParams(p) => params = Some(p),
            Attribute::EcPoint(p) => point = Some(p),
            _ => {}
        }
    }
    let params = params.ok_or_else(|| attribute_error("CKA_EC_PARAMS", "not present"))?;
    let point = point.ok_or_else(|| attribute_error("CKA_EC_POINT", "not present"))?;

    let Some(curve) = NamedCurve::from_ec_params(&params) else {
        return Ok(PublicKey::Unknown(format!(
            "ec key on curve {}",
            hex::encode(&params)
        )));
    };
    let point = unwrap_ec_point(curve, &point)?;
    Ok(PublicKey::Ecdsa(EcdsaPublicKey::new(curve, point)))
}

impl TokenSession for Pkcs11Token {
    type KeyPair = Pkcs11KeyPair;
    type SecretKey = Pkcs11SecretKey;
    type Random = Pkcs11Random;

    fn generate_rsa_key_pair(&self, id: &[u8], bits: usize) -> HsmResult<Pkcs11KeyPair> {
        self.generate_rsa(id, None, bits)
    }

    fn generate_rsa_key_pair_with_label(
        &self,
        id: &[u8],
        label: &[u8],
        bits: usize,
    ) -> HsmResult<Pkcs11KeyPair> {
        self.generate_rsa(id, Some(label), bits)
    }

    fn generate_ecdsa_key_pair(&self, id: &[u8], curve: NamedCurve) -> HsmResult<Pkcs11KeyPair> {
        self.generate_ecdsa(id, None, curve)
    }

    fn generate_ecdsa_key_pair_with_label(
        &self,
        id: &[u8],
        label: &[u8],
        curve: NamedCurve,
    ) -> HsmResult<Pkcs11KeyPair> {
        self.generate_ecdsa(id, Some(label), curve)
    }

    fn generate_secret_key(
        &self,
        id: &[u8],
        bits: usize,
        cipher: SymmetricCipher,
    ) -> HsmResult<Pkcs11SecretKey> {
        self.generate_secret(id, None, bits, cipher)
    }

    fn generate_secret_key_with_label(
        &self,
        id: &[u8],
        label: &[u8],
        bits: usize,
        cipher: SymmetricCipher,
    ) -> HsmResult<Pkcs11SecretKey> {
        self.generate_secret(id, Some(label), bits, cipher)
    }

    fn find_key_pair(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<Pkcs11KeyPair> {
        if id.is_empty() {
            return Err(LookupError::EmptyId.into());
        }
        let template = Self::search_template(ObjectClass::PRIVATE_KEY, id, label);
        self.collect_key_pairs(&template)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LookupError::KeyPairNotFound {
                    key_id: key_id_string(id),
                }
                .into()
            })
    }

    fn find_key_pairs(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<Vec<Pkcs11KeyPair>> {
        if id.is_empty() && label.is_none() {
            return Err(LookupError::EmptyId.into());
        }
        let template = Self::search_template(ObjectClass::PRIVATE_KEY, id, label);
        self.collect_key_pairs(&template)
    }

    fn find_all_key_pairs(&self) -> HsmResult<Vec<Pkcs11KeyPair>> {
        self.collect_key_pairs(&[Attribute::Class(ObjectClass::PRIVATE_KEY)])
    }

    fn find_key(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<Pkcs11SecretKey> {
        if id.is_empty() && label.is_none() {
            return Err(LookupError::EmptyId.into());
        }
        let template = Self::search_template(ObjectClass::SECRET_KEY, id, label);
        self.collect_secret_keys(&template)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LookupError::SecretKeyNotFound {
                    key_id: key_id_string(id),
                }
                .into()
            })
    }

    fn find_keys(&self, id: &[u8], label: Option<&[u8]>) -> HsmResult<Vec<Pkcs11SecretKey>> {
        if id.is_empty() && label.is_none() {
            return Err(LookupError::EmptyId.into());
        }
        let template = Self::search_template(ObjectClass::SECRET_KEY, id, label);
        self.collect_secret_keys(&template)
    }

    fn new_random_reader(&self) -> HsmResult<Pkcs11Random> {
        Ok(Pkcs11Random {
            inner: Arc::clone(&self.inner),
        })
    }
}

/// Private key handle and the normalized public half of the same id
pub struct Pkcs11KeyPair {
    inner: Arc<TokenInner>,
    private_handle: ObjectHandle,
    public_handle: ObjectHandle,
    public: PublicKey,
}

impl Pkcs11KeyPair {
    fn mechanism_and_input<'a>(
        &self,
        data: &'a [u8],
        options: &SignerOptions,
    ) -> HsmResult<(Mechanism<'static>, std::borrow::Cow<'a, [u8]>)> {
        let digest = options.digest_or_default();
        match &self.public {
            PublicKey::Ecdsa(_) => Ok((Mechanism::Ecdsa, data.into())),
            PublicKey::Rsa(_) => match options.rsa_padding {
                RsaPadding::Pss => Ok((Mechanism::RsaPkcsPss(pss_params(digest)), data.into())),
                RsaPadding::Pkcs1v15 => {
                    let mut digest_info = digest_info_prefix(digest).to_vec();
                    digest_info.extend_from_slice(data);
                    Ok((Mechanism::RsaPkcs, digest_info.into()))
                }
            },
            PublicKey::Symmetric | PublicKey::Unknown(_) => {
                Err(TokenError::Signing {
                    reason: format!("key of type {} cannot sign", self.public.kind()),
                }
                .into())
            }
        }
    }
}

impl KeyPair for Pkcs11KeyPair {
    fn sign(
        &self,
        _rand: &dyn RandomSource,
        data: &[u8],
        options: &SignerOptions,
    ) -> HsmResult<Vec<u8>> {
        let (mechanism, input) = self.mechanism_and_input(data, options)?;
        let signature = {
            let session = self.inner.session()?;
            session
                .sign(&mechanism, self.private_handle, &input)
                .map_err(|e| TokenError::Signing {
                    reason: e.to_string(),
                })?
        };
        match &self.public {
            PublicKey::Ecdsa(key) => raw_ecdsa_to_der(key.curve, &signature),
            _ => Ok(signature),
        }
    }

    fn public_key(&self) -> &PublicKey {
        &self.public
    }

    fn delete(self) -> HsmResult<()> {
        let session = self.inner.session()?;
        let delete_error = |e: cryptoki::error::Error| TokenError::Delete {
            reason: e.to_string(),
        };
        session
            .destroy_object(self.private_handle)
            .map_err(delete_error)?;
        session
            .destroy_object(self.public_handle)
            .map_err(delete_error)?;
        debug!("Key pair deleted");
        Ok(())
    }
}

/// AES key used in GCM mode
///
/// Ciphertexts are laid out as `iv || ciphertext || tag`, with a fresh
/// 12-byte IV drawn from the token for every encryption.
pub struct Pkcs11SecretKey {
    inner: Arc<TokenInner>,
    handle: ObjectHandle,
}

impl SecretKey for Pkcs11SecretKey {
    fn ciphertext_len(&self, plaintext_len: usize) -> usize {
        GCM_IV_LEN + plaintext_len + GCM_TAG_LEN
    }

    fn plaintext_len(&self, ciphertext_len: usize) -> usize {
        ciphertext_len.saturating_sub(GCM_IV_LEN + GCM_TAG_LEN)
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
        let session = self.inner.session()?;
        let mut iv = [0u8; GCM_IV_LEN];
        session
            .generate_random_slice(&mut iv)
            .map_err(|e| TokenError::Random {
                reason: e.to_string(),
            })?;
        let mechanism = Mechanism::AesGcm(GcmParams::new(&iv, &[], Ulong::from(128u64)));
        let sealed = session
            .encrypt(&mechanism, self.handle, src)
            .map_err(|e| TokenError::Cipher {
                reason: e.to_string(),
            })?;

        let written = GCM_IV_LEN + sealed.len();
        if dst.len() < written {
            return Err(TokenError::BufferTooSmall {
                needed: written,
                available: dst.len(),
            }
            .into());
        }
        dst[..GCM_IV_LEN].copy_from_slice(&iv);
        dst[GCM_IV_LEN..written].copy_from_slice(&sealed);
        Ok(written)
    }

    fn decrypt(&self, dst: &mut [u8], src: &[u8]) -> HsmResult<usize> {
        if src.len() < GCM_IV_LEN + GCM_TAG_LEN {
            return Err(TokenError::Cipher {
                reason: format!("ciphertext of {} bytes is too short", src.len()),
            }
            .into());
        }
        let (iv, sealed) = src.split_at(GCM_IV_LEN);
        let session = self.inner.session()?;
        let mechanism = Mechanism::AesGcm(GcmParams::new(iv, &[], Ulong::from(128u64)));
        let plaintext = session
            .decrypt(&mechanism, self.handle, sealed)
            .map_err(|e| TokenError::Cipher {
                reason: e.to_string(),
            })?;

        if dst.len() < plaintext.len() {
            return Err(TokenError::BufferTooSmall {
                needed: plaintext.len(),
                available: dst.len(),
            }
            .into());
        }
        dst[..plaintext.len()].copy_from_slice(&plaintext);
        Ok(plaintext.len())
    }
}

/// Random source backed by C_GenerateRandom
pub struct Pkcs11Random {
    inner: Arc<TokenInner>,
}

impl RandomSource for Pkcs11Random {
    fn read(&self, buf: &mut [u8]) -> HsmResult<usize> {
        let session = self.inner.session()?;
        session
            .generate_random_slice(buf)
            .map_err(|e| TokenError::Random {
                reason: e.to_string(),
            })?;
        Ok(buf.len())
    }
}
