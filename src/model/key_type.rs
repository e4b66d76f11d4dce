//! Key type strings and the codec for `<family>-<parameter>` descriptors

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

/// Separator between major family and parameter
pub const SEPARATOR: char = '-';

/// Key type string as exchanged with the host contract
///
/// Examples: `rsa-2048`, `ecdsa-p256`, `aes256gcm`, `ed25519`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyType(String);

impl KeyType {
    pub fn new(key_type: impl Into<String>) -> Self {
        Self(key_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<KeyAlgorithm> for KeyType {
    fn from(alg: KeyAlgorithm) -> Self {
        Self::new(alg.as_str())
    }
}

/// Key algorithms of the host contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa2048,
    Rsa3072,
    Rsa4096,
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
    Aes256Gcm,
    Ed25519,
}

impl KeyAlgorithm {
    pub const ALL: [KeyAlgorithm; 8] = [
        KeyAlgorithm::EcdsaP256,
        KeyAlgorithm::EcdsaP384,
        KeyAlgorithm::EcdsaP521,
        KeyAlgorithm::Aes256Gcm,
        KeyAlgorithm::Ed25519,
        KeyAlgorithm::Rsa2048,
        KeyAlgorithm::Rsa3072,
        KeyAlgorithm::Rsa4096,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa2048 => "rsa-2048",
            KeyAlgorithm::Rsa3072 => "rsa-3072",
            KeyAlgorithm::Rsa4096 => "rsa-4096",
            KeyAlgorithm::EcdsaP256 => "ecdsa-p256",
            KeyAlgorithm::EcdsaP384 => "ecdsa-p384",
            KeyAlgorithm::EcdsaP521 => "ecdsa-p521",
            KeyAlgorithm::Aes256Gcm => "aes256gcm",
            KeyAlgorithm::Ed25519 => "ed25519",
        }
    }

    /// Look up the contract algorithm named by a key type string
    pub fn from_key_type(key_type: &KeyType) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == key_type.as_str())
    }

    pub fn key_type(self) -> KeyType {
        self.into()
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level algorithm family, the first segment of a key type string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorKeyType {
    Rsa,
    Ecdsa,
    Aes,
    Ed25519,
}

impl MajorKeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            MajorKeyType::Rsa => "rsa",
            MajorKeyType::Ecdsa => "ecdsa",
            MajorKeyType::Aes => "aes",
            MajorKeyType::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for MajorKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MajorKeyType {
    type Err = KeyTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rsa" => Ok(MajorKeyType::Rsa),
            "ecdsa" => Ok(MajorKeyType::Ecdsa),
            "aes" => Ok(MajorKeyType::Aes),
            "ed25519" => Ok(MajorKeyType::Ed25519),
            other => Err(KeyTypeError::UnknownFamily {
                family: other.to_string(),
            }),
        }
    }
}

/// Split a key type into its major family and parameter
///
/// # Errors
///
/// Returns `KeyTypeError::Malformed` unless the string contains exactly one
/// separator, and `KeyTypeError::UnknownFamily` for a family outside
/// [`MajorKeyType`].
pub fn decode(key_type: &KeyType) -> Result<(MajorKeyType, String), KeyTypeError> {
    let parts: Vec<&str> = key_type.as_str().split(SEPARATOR).collect();
    let [family, parameter] = parts.as_slice() else {
        return Err(KeyTypeError::Malformed {
            key_type: key_type.to_string(),
        });
    };
    let family = family.parse::<MajorKeyType>()?;
    Ok((family, (*parameter).to_string()))
}

/// Build a key type from a family and a native parameter name
///
/// The parameter is lowercased and stripped of hyphens, so native names such
/// as `P-256` map onto the contract's `ecdsa-p256`.
pub fn encode(family: MajorKeyType, parameter: &str) -> KeyType {
    let parameter = parameter.replace(SEPARATOR, "").to_lowercase();
    KeyType(format!("{}{}{}", family.as_str(), SEPARATOR, parameter))
}

/// Errors that can occur when decoding key types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyTypeError {
    /// Not of the form `type-typeParam`
    #[error("expected key type in a form `type`-`typeParam`, got {key_type}")]
    Malformed { key_type: String },

    /// Family outside the closed enumeration
    #[error("unknown key family {family}")]
    UnknownFamily { family: String },

    /// RSA parameter is not a bit length
    #[error("invalid bit length {parameter}: {source}")]
    InvalidBitLength {
        parameter: String,
        #[source]
        source: ParseIntError,
    },

    /// Decoded family does not match the requested generation path
    #[error("expected type {expected} - got {actual}")]
    FamilyMismatch {
        expected: MajorKeyType,
        actual: MajorKeyType,
    },

    /// Curve parameter outside P-256, P-384 and P-521
    #[error("unknown curve {curve}")]
    UnknownCurve { curve: String },
}
