//! Ports (traits) of the provider
//!
//! The token-session traits describe what the provider needs from an HSM
//! session; the core depends on these abstractions, not on PKCS#11 directly.
//! [`CryptoProvider`] is the contract the provider offers to its host.

mod crypto_provider;
mod key_pair;
mod random;
mod secret_key;
mod token_session;


pub use crypto_provider::{CryptoProvider, CryptoProviderModule};
pub use key_pair::KeyPair;
pub use random::RandomSource;
pub use secret_key::SecretKey;
pub use token_session::{SymmetricCipher, TokenSession};
