//! Configuration for the wallet clients

pub mod rpc;

use crate::poller::PollOptions;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

// Re-export RPC config
pub use rpc::RpcConfig;

/// Custody API key environment variable name
pub const API_KEY_ENV: &str = "CROSSMINT_API_KEY";

/// Custody API base URL environment variable name
pub const BASE_URL_ENV: &str = "CROSSMINT_BASE_URL";

/// Staging endpoint of the custody wallets API
pub const DEFAULT_BASE_URL: &str = "https://staging.crossmint.com/api/v1-alpha2";

/// Poll budget as it appears in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status reads (milliseconds)
    pub interval_ms: u64,
    /// Maximum number of status reads
    pub max_attempts: u32,
}

impl From<PollConfig> for PollOptions {
    fn from(config: PollConfig) -> Self {
        PollOptions::new(Duration::from_millis(config.interval_ms), config.max_attempts)
    }
}

impl From<PollOptions> for PollConfig {
    fn from(options: PollOptions) -> Self {
        Self {
            interval_ms: u64::try_from(options.interval.as_millis()).unwrap_or(u64::MAX),
            max_attempts: options.max_attempts,
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL")
}

fn default_transaction_poll() -> PollConfig {
    PollOptions::transaction().into()
}

fn default_signature_poll() -> PollConfig {
    PollOptions::signature().into()
}

fn default_action_poll() -> PollConfig {
    PollOptions::action().into()
}

/// Credentials and tuning for the custody wallets API
///
/// The API key is held in a `SecretString` and is only exposed when a request
/// header is built.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletsConfig {
    /// Server-side API key
    pub api_key: SecretString,
    /// API base URL, including the version path segment
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    /// Additional headers attached to every request
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
    /// Poll budget for transactions
    #[serde(default = "default_transaction_poll")]
    pub transaction_poll: PollConfig,
    /// Poll budget for message and typed-data signatures
    #[serde(default = "default_signature_poll")]
    pub signature_poll: PollConfig,
    /// Poll budget for actions and delegated signer registration
    #[serde(default = "default_action_poll")]
    pub action_poll: PollConfig,
}

impl WalletsConfig {
    pub fn new(api_key: impl Into<String>, base_url: Url) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url,
            extra_headers: BTreeMap::new(),
            transaction_poll: default_transaction_poll(),
            signature_poll: default_signature_poll(),
            action_poll: default_action_poll(),
        }
    }

    /// Load from `CROSSMINT_API_KEY` / `CROSSMINT_BASE_URL`, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            Error::Config(format!(
                "Environment variable {} not set. Required for the wallets API.",
                API_KEY_ENV
            ))
        })?;

        let base_url = match std::env::var(BASE_URL_ENV) {
            Ok(raw) => Url::parse(&raw)
                .map_err(|e| Error::Config(format!("Invalid {}: {}", BASE_URL_ENV, e)))?,
            Err(_) => default_base_url(),
        };

        tracing::debug!(base_url = %base_url, "Loaded wallets API config from environment");

        Ok(Self::new(api_key, base_url))
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_transaction_poll(mut self, options: PollOptions) -> Self {
        self.transaction_poll = options.into();
        self
    }

    pub fn with_signature_poll(mut self, options: PollOptions) -> Self {
        self.signature_poll = options.into();
        self
    }

    pub fn with_action_poll(mut self, options: PollOptions) -> Self {
        self.action_poll = options.into();
        self
    }
}
