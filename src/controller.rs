//! Provider controller
//!
//! Owns the single authenticated token session, the default signer options
//! and the randomness source handed to signing operations. A controller is
//! built once at startup and never mutated afterwards.

use tracing::info;

use crate::adapters::Pkcs11Token;
use crate::config::HsmConfig;
use crate::error::HsmResult;
use crate::model::SignerOptions;
use crate::ports::TokenSession;

pub struct HsmController<S: TokenSession> {
    config: Option<HsmConfig>,
    api: S,
    signer_options: SignerOptions,
    rand: S::Random,
}

impl<S: TokenSession> HsmController<S> {
    /// Wrap an already authenticated session
    ///
    /// # Errors
    ///
    /// Fails if the session cannot provide a random source
    pub fn with_api_and_random_reader(
        config: Option<HsmConfig>,
        api: S,
        signer_options: SignerOptions,
    ) -> HsmResult<Self> {
        let rand = api.new_random_reader()?;
        Ok(Self {
            config,
            api,
            signer_options,
            rand,
        })
    }

    pub fn api(&self) -> &S {
        &self.api
    }

    pub fn signer_options(&self) -> &SignerOptions {
        &self.signer_options
    }

    pub fn rand(&self) -> &S::Random {
        &self.rand
    }

    /// Configuration the session was opened with, if it came from one
    pub fn config(&self) -> Option<&HsmConfig> {
        self.config.as_ref()
    }
}

impl HsmController<Pkcs11Token> {
    /// Open a PKCS#11 session as configured and wrap it
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the module, token or login fails
    pub fn connect(config: HsmConfig) -> HsmResult<Self> {
        let token = Pkcs11Token::open(&config)?;
        info!(token = %config.token_label, "Provider controller ready");
        Self::with_api_and_random_reader(Some(config), token, SignerOptions::default())
    }
}
