//! Named elliptic curves supported for ECDSA keys

use std::fmt;

use der::asn1::ObjectIdentifier;
use der::{Decode, Encode};

use super::KeyTypeError;

/// NIST prime curves the token can generate ECDSA keys on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedCurve {
    P256,
    P384,
    P521,
}

impl NamedCurve {
    pub const P256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
    pub const P384_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
    pub const P521_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

    /// Map a key type parameter (`p256`, `p384`, `p521`) to a curve
    ///
    /// # Errors
    ///
    /// Returns `KeyTypeError::UnknownCurve` for any other name
    pub fn from_parameter(parameter: &str) -> Result<Self, KeyTypeError> {
        match parameter {
            "p256" => Ok(NamedCurve::P256),
            "p384" => Ok(NamedCurve::P384),
            "p521" => Ok(NamedCurve::P521),
            other => Err(KeyTypeError::UnknownCurve {
                curve: other.to_string(),
            }),
        }
    }

    /// Native curve name, as reported by curve parameters (`P-256`)
    pub fn name(self) -> &'static str {
        match self {
            NamedCurve::P256 => "P-256",
            NamedCurve::P384 => "P-384",
            NamedCurve::P521 => "P-521",
        }
    }

    pub fn oid(self) -> ObjectIdentifier {
        match self {
            NamedCurve::P256 => Self::P256_OID,
            NamedCurve::P384 => Self::P384_OID,
            NamedCurve::P521 => Self::P521_OID,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [NamedCurve::P256, NamedCurve::P384, NamedCurve::P521]
            .into_iter()
            .find(|curve| curve.oid() == *oid)
    }

    /// DER-encoded OID, the form PKCS#11 expects in CKA_EC_PARAMS
    pub fn to_ec_params(self) -> der::Result<Vec<u8>> {
        self.oid().to_der()
    }

    /// Parse CKA_EC_PARAMS back into a curve
    pub fn from_ec_params(params: &[u8]) -> Option<Self> {
        ObjectIdentifier::from_der(params)
            .ok()
            .and_then(|oid| Self::from_oid(&oid))
    }

    /// Size in bytes of a field element
    pub fn field_len(self) -> usize {
        match self {
            NamedCurve::P256 => 32,
            NamedCurve::P384 => 48,
            NamedCurve::P521 => 66,
        }
    }
}

impl fmt::Display for NamedCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
