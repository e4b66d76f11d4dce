//! Public halves of token keys
//!
//! A token hands back public keys in several native representations. They are
//! normalized once, at lookup time, into [`PublicKey`] so that export and
//! verification can pattern-match instead of re-probing the representation.

use rsa::RsaPublicKey;

use super::NamedCurve;

/// Public key of an object found on the token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    Ecdsa(EcdsaPublicKey),
    /// Symmetric key, which has no public half
    Symmetric,
    /// Key type the provider does not handle, with the token's description
    Unknown(String),
}

impl PublicKey {
    pub fn kind(&self) -> &str {
        match self {
            PublicKey::Rsa(_) => "rsa",
            PublicKey::Ecdsa(_) => "ecdsa",
            PublicKey::Symmetric => "secret key",
            PublicKey::Unknown(description) => description,
        }
    }
}

/// ECDSA public key as a curve and its uncompressed SEC1 point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdsaPublicKey {
    pub curve: NamedCurve,
    /// `0x04 || X || Y`
    pub point: Vec<u8>,
}

impl EcdsaPublicKey {
    pub fn new(curve: NamedCurve, point: Vec<u8>) -> Self {
        Self { curve, point }
    }

    /// ECDH-compatible encoding of the point
    pub fn to_bytes(&self) -> Vec<u8> {
        self.point.clone()
    }
}
