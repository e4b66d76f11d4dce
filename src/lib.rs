//! Generic crypto provider backed by a PKCS#11 hardware security module
//!
//! The crate translates the host's algorithm-agnostic provider contract
//! ([`ports::CryptoProvider`]) into operations on an authenticated token
//! session ([`ports::TokenSession`]). Key types travel across the contract as
//! `<family>-<parameter>` strings (see [`model::key_type`]); public keys come
//! back from the token in several representations and are normalized into
//! [`model::PublicKey`] before they are exported or used for verification.
//!
//! ```no_run
//! use hsm_crypto_provider::{CryptoProviderModule, HsmProviderModule};
//!
//! let provider = HsmProviderModule::new().crypto_provider()?;
//! let random = provider.generate_random(&Default::default(), 32)?;
//! # Ok::<(), hsm_crypto_provider::HsmError>(())
//! ```

mod adapters;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod plugin;
pub mod ports;
pub mod provider;

// Re-export commonly used types
pub use adapters::{Pkcs11KeyPair, Pkcs11Random, Pkcs11SecretKey, Pkcs11Token};
pub use config::HsmConfig;
pub use controller::HsmController;
pub use error::{HsmError, HsmResult};
pub use plugin::HsmProviderModule;
pub use ports::{CryptoProvider, CryptoProviderModule};
pub use provider::{HsmCryptoProvider, HSM_NAMESPACE};
