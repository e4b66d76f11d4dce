//! Entry point the host resolves to load this provider

use tracing::info;

use crate::config::HsmConfig;
use crate::controller::HsmController;
use crate::error::HsmResult;
use crate::ports::{CryptoProvider, CryptoProviderModule};
use crate::provider::HsmCryptoProvider;

/// Provider factory
///
/// Without an explicit configuration the token settings are read from the
/// environment when the provider is built.
#[derive(Debug, Clone, Default)]
pub struct HsmProviderModule {
    config: Option<HsmConfig>,
}

impl HsmProviderModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HsmConfig) -> Self {
        Self {
            config: Some(config),
        }
    }
}

impl CryptoProviderModule for HsmProviderModule {
    fn crypto_provider(&self) -> HsmResult<Box<dyn CryptoProvider>> {
        let config = match &self.config {
            Some(config) => config.clone(),
            None => HsmConfig::from_env()?,
        };
        let controller = HsmController::connect(config)?;
        info!("HSM crypto provider initialized");
        Ok(Box::new(HsmCryptoProvider::new(controller)))
    }
}
