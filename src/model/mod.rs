mod curve;
mod hash;
mod identifier;
pub mod key_type;
mod public_key;
mod signer_options;

pub use curve::NamedCurve;
pub use hash::{sha256, HashAlgorithm};
pub use identifier::{
    CryptoContext, CryptoFilter, CryptoHashParameter, CryptoIdentifier, CryptoKey,
    CryptoKeyParameter, CryptoKeySet,
};
pub use key_type::{KeyAlgorithm, KeyType, KeyTypeError, MajorKeyType};
pub use public_key::{EcdsaPublicKey, PublicKey};
pub use signer_options::{RsaPadding, SignerOptions};
