//! Adapters - concrete implementations of ports (traits)

mod pkcs11;

#[cfg(test)]
pub mod fake_token;

// Re-export for convenience
pub use pkcs11::{Pkcs11KeyPair, Pkcs11Random, Pkcs11SecretKey, Pkcs11Token};
