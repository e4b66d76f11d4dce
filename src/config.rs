//! Token session configuration
//!
//! The provider is configured through the environment. A `.env` file in the
//! working directory is honoured when present.

use std::fmt;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::{ConfigError, HsmResult};

/// Path of the PKCS#11 module to load
pub const MODULE_PATH_VAR: &str = "CRYPTO_EXECUTABLE_PATH";
/// Label of the token (partition) to log into
pub const TOKEN_LABEL_VAR: &str = "HSM_PARTITION_LABEL";
/// User PIN of the token
pub const PIN_VAR: &str = "HSM_PARTITION_PASSWORD";

/// Everything needed to open an authenticated token session
#[derive(Clone)]
pub struct HsmConfig {
    pub module_path: PathBuf,
    pub token_label: String,
    pub pin: SecretString,
}

impl fmt::Debug for HsmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HsmConfig")
            .field("module_path", &self.module_path)
            .field("token_label", &self.token_label)
            .field("pin", &"[REDACTED]")
            .finish()
    }
}

impl HsmConfig {
    pub fn new(
        module_path: impl Into<PathBuf>,
        token_label: impl Into<String>,
        pin: impl Into<String>,
    ) -> Self {
        Self {
            module_path: module_path.into(),
            token_label: token_label.into(),
            pin: SecretString::new(pin.into()),
        }
    }

    /// Read the configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVariable` naming the first unset variable
    pub fn from_env() -> HsmResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from optional parts, as parsed by a CLI
    pub fn from_parts(
        module_path: Option<PathBuf>,
        token_label: Option<String>,
        pin: Option<String>,
    ) -> HsmResult<Self> {
        let module_path = module_path.ok_or(ConfigError::MissingVariable {
            name: MODULE_PATH_VAR,
        })?;
        let token_label = token_label.ok_or(ConfigError::MissingVariable {
            name: TOKEN_LABEL_VAR,
        })?;
        let pin = pin.ok_or(ConfigError::MissingVariable { name: PIN_VAR })?;
        Ok(Self::new(module_path, token_label, pin))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> HsmResult<Self> {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());
        Self::from_parts(
            non_empty(MODULE_PATH_VAR).map(PathBuf::from),
            non_empty(TOKEN_LABEL_VAR),
            non_empty(PIN_VAR),
        )
    }
}
