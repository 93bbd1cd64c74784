//! RPC endpoint configuration
//!
//! EVM endpoints are resolved per chain id:
//! 1. Per-chain env vars (ETH_RPC_URL, BASE_RPC_URL, etc.) - highest priority
//! 2. Provider API keys (ALCHEMY_API_KEY, INFURA_API_KEY) - builds URLs automatically
//! 3. Public RPC fallbacks - for testing only
//!
//! Solana uses SOLANA_RPC_URL, falling back to the public mainnet endpoint.
//!
//! # Examples
//!
//! ```bash
//! export BASE_SEPOLIA_RPC_URL="https://base-sepolia.g.alchemy.com/v2/YOUR_KEY"
//! export SOLANA_RPC_URL="https://api.devnet.solana.com"
//! ```

use std::collections::HashMap;

/// RPC configuration for EVM chains and Solana
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// EVM RPC URLs indexed by chain ID
    urls: HashMap<u64, String>,
    /// Solana JSON-RPC URL
    solana_url: String,
}

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const OPTIMISM: u64 = 10;
    pub const POLYGON: u64 = 137;
    pub const BASE: u64 = 8453;
    pub const ARBITRUM: u64 = 42161;
    pub const SEPOLIA: u64 = 11155111;
    pub const BASE_SEPOLIA: u64 = 84532;
}

/// Environment variable names
mod env_vars {
    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    pub const OPTIMISM_RPC_URL: &str = "OPTIMISM_RPC_URL";
    pub const POLYGON_RPC_URL: &str = "POLYGON_RPC_URL";
    pub const BASE_RPC_URL: &str = "BASE_RPC_URL";
    pub const ARBITRUM_RPC_URL: &str = "ARBITRUM_RPC_URL";
    pub const SEPOLIA_RPC_URL: &str = "SEPOLIA_RPC_URL";
    pub const BASE_SEPOLIA_RPC_URL: &str = "BASE_SEPOLIA_RPC_URL";
    pub const SOLANA_RPC_URL: &str = "SOLANA_RPC_URL";

    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
    pub const INFURA_API_KEY: &str = "INFURA_API_KEY";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const ETHEREUM: &str = "https://eth.llamarpc.com";
    pub const OPTIMISM: &str = "https://mainnet.optimism.io";
    pub const POLYGON: &str = "https://polygon-rpc.com";
    pub const BASE: &str = "https://mainnet.base.org";
    pub const ARBITRUM: &str = "https://arb1.arbitrum.io/rpc";
    pub const SEPOLIA: &str = "https://rpc.sepolia.org";
    pub const BASE_SEPOLIA: &str = "https://sepolia.base.org";
    pub const SOLANA: &str = "https://api.mainnet-beta.solana.com";
}

const PER_CHAIN_VARS: [(u64, &str); 7] = [
    (chains::ETHEREUM, env_vars::ETH_RPC_URL),
    (chains::OPTIMISM, env_vars::OPTIMISM_RPC_URL),
    (chains::POLYGON, env_vars::POLYGON_RPC_URL),
    (chains::BASE, env_vars::BASE_RPC_URL),
    (chains::ARBITRUM, env_vars::ARBITRUM_RPC_URL),
    (chains::SEPOLIA, env_vars::SEPOLIA_RPC_URL),
    (chains::BASE_SEPOLIA, env_vars::BASE_SEPOLIA_RPC_URL),
];

impl RpcConfig {
    /// Create RPC config from environment variables
    pub fn from_env() -> Self {
        let mut urls = HashMap::new();

        for (chain_id, var) in PER_CHAIN_VARS {
            if let Ok(url) = std::env::var(var) {
                tracing::debug!(chain_id, var, "Using per-chain RPC URL");
                urls.insert(chain_id, url);
            }
        }

        if urls.is_empty() {
            if let Ok(key) = std::env::var(env_vars::ALCHEMY_API_KEY) {
                tracing::info!("Building RPC URLs from ALCHEMY_API_KEY");
                for (chain_id, network) in [
                    (chains::ETHEREUM, "eth-mainnet"),
                    (chains::OPTIMISM, "opt-mainnet"),
                    (chains::POLYGON, "polygon-mainnet"),
                    (chains::BASE, "base-mainnet"),
                    (chains::ARBITRUM, "arb-mainnet"),
                    (chains::SEPOLIA, "eth-sepolia"),
                    (chains::BASE_SEPOLIA, "base-sepolia"),
                ] {
                    urls.insert(
                        chain_id,
                        format!("https://{}.g.alchemy.com/v2/{}", network, key),
                    );
                }
            }
        }

        if urls.is_empty() {
            if let Ok(key) = std::env::var(env_vars::INFURA_API_KEY) {
                tracing::info!("Building RPC URLs from INFURA_API_KEY");
                for (chain_id, network) in [
                    (chains::ETHEREUM, "mainnet"),
                    (chains::OPTIMISM, "optimism-mainnet"),
                    (chains::POLYGON, "polygon-mainnet"),
                    (chains::ARBITRUM, "arbitrum-mainnet"),
                    (chains::SEPOLIA, "sepolia"),
                ] {
                    urls.insert(chain_id, format!("https://{}.infura.io/v3/{}", network, key));
                }
            }
        }

        if !urls.contains_key(&chains::ETHEREUM) {
            tracing::warn!("No RPC configured for Ethereum, using public RPC (rate limited)");
        }
        for (chain_id, url) in [
            (chains::ETHEREUM, public_rpcs::ETHEREUM),
            (chains::OPTIMISM, public_rpcs::OPTIMISM),
            (chains::POLYGON, public_rpcs::POLYGON),
            (chains::BASE, public_rpcs::BASE),
            (chains::ARBITRUM, public_rpcs::ARBITRUM),
            (chains::SEPOLIA, public_rpcs::SEPOLIA),
            (chains::BASE_SEPOLIA, public_rpcs::BASE_SEPOLIA),
        ] {
            urls.entry(chain_id).or_insert_with(|| url.to_string());
        }

        let solana_url = std::env::var(env_vars::SOLANA_RPC_URL)
            .unwrap_or_else(|_| public_rpcs::SOLANA.to_string());

        Self { urls, solana_url }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>, solana_url: impl Into<String>) -> Self {
        Self {
            urls,
            solana_url: solana_url.into(),
        }
    }

    /// Get RPC URL for an EVM chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    /// Solana JSON-RPC URL
    pub fn solana(&self) -> &str {
        &self.solana_url
    }

    /// Check if a chain is configured
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
