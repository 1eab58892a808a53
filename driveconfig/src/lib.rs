#![allow(clippy::multiple_crate_versions)]

mod token_store;

pub use crate::token_store::FileTokenStore;

use drivesafe::types::LoginBinding;
use drivesafe::TransportPolicy;
use serde::{Deserialize, Serialize};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

pub const APP_NAME: &str = "drivesafe";

/// Where the backend base URL comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaseUrl {
    Literal(String),
    Env { env: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Log request and response bodies at debug level
    #[serde(default = "default_true")]
    pub log_bodies: bool,
    /// Login contract used when none is given explicitly
    #[serde(default)]
    pub login: LoginBinding,
    pub base_url: BaseUrl,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            log_bodies: true,
            login: LoginBinding::default(),
            base_url: BaseUrl::Literal(String::new()),
        }
    }
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, thiserror::Error)]
pub enum DriveConfigError {
    #[error("config error: {0}")]
    Confy(#[from] confy::ConfyError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("missing base URL in config; set `base_url` in the drivesafe config file")]
    MissingBaseUrl,
    #[error("environment variable '{env}' not found")]
    MissingEnv { env: String },
    #[error(
        "base URL required but stdin is not interactive; set `base_url` in {path} (example: base_url = \"http://10.0.2.2:8000\" or base_url = {{ env = \"...\" }})",
        path = .path.display()
    )]
    NonInteractive { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, DriveConfigError>;

impl DriveConfig {
    /// Loads the config file from the standard OS location.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or deserialized.
    pub fn load() -> Result<Self> {
        Ok(confy::load(APP_NAME, None)?)
    }

    /// Loads config or asks the user for a base URL when none is configured.
    ///
    /// # Errors
    /// Returns an error if the config cannot be loaded, the base URL cannot be
    /// resolved, or onboarding fails (including non-interactive stdin).
    pub fn load_or_onboard() -> Result<Self> {
        let config = Self::load()?;
        match &config.base_url {
            BaseUrl::Literal(value) if value.trim().is_empty() => config.onboard_base_url(),
            _ => {
                config.base_url.resolve()?;
                Ok(config)
            }
        }
    }

    /// Stores the config to the standard OS location.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn store(&self) -> Result<()> {
        confy::store(APP_NAME, None, self)?;
        Ok(())
    }

    /// Resolves the base URL from the configured source.
    ///
    /// # Errors
    /// Returns an error if the source is empty or the variable is unset.
    pub fn base_url(&self) -> Result<String> {
        self.base_url.resolve()
    }

    /// Transport policy for clients built under this config.
    #[must_use]
    pub fn transport_policy(&self) -> TransportPolicy {
        TransportPolicy::default().with_log_bodies(self.log_bodies)
    }

    fn onboard_base_url(mut self) -> Result<Self> {
        let config_path = confy::get_configuration_file_path(APP_NAME, None)?;
        if !io::stdin().is_terminal() {
            return Err(DriveConfigError::NonInteractive { path: config_path });
        }

        eprintln!(
            "DriveSafe base URL not configured. It will be stored at: {}",
            config_path.display()
        );
        eprint!("Enter the backend base URL: ");
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DriveConfigError::MissingBaseUrl);
        }

        self.base_url = BaseUrl::Literal(trimmed.to_string());
        self.store()?;
        Ok(self)
    }
}

impl BaseUrl {
    fn resolve(&self) -> Result<String> {
        let value = match self {
            Self::Literal(value) => value.clone(),
            Self::Env { env } => {
                std::env::var(env).map_err(|_| DriveConfigError::MissingEnv { env: env.clone() })?
            }
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DriveConfigError::MissingBaseUrl);
        }
        Ok(trimmed.to_string())
    }
}
