//! Chain identities and read-only RPC capabilities
//!
//! Wallet facades never talk to a chain node for writes; those go through the
//! custody backend. Reads (contract calls, native balances) go through the
//! `EvmReader` / `SolanaReader` traits so any RPC stack can be injected.

use crate::config::rpc::chains;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Chain family tag used for capability dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Chain {
    Evm { id: u64 },
    Solana,
    Aptos,
    Chromia,
}

impl Chain {
    pub fn family(&self) -> &'static str {
        match self {
            Chain::Evm { .. } => "evm",
            Chain::Solana => "solana",
            Chain::Aptos => "aptos",
            Chain::Chromia => "chromia",
        }
    }
}

/// Native currency metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeCurrency {
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
}

const ETHER: NativeCurrency = NativeCurrency {
    symbol: "ETH",
    name: "Ether",
    decimals: 18,
};

const POL: NativeCurrency = NativeCurrency {
    symbol: "POL",
    name: "Polygon Ecosystem Token",
    decimals: 18,
};

pub const SOL: NativeCurrency = NativeCurrency {
    symbol: "SOL",
    name: "Solana",
    decimals: 9,
};

/// EVM chains supported by the custody backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvmChain {
    Ethereum,
    Optimism,
    Polygon,
    Base,
    Arbitrum,
    EthereumSepolia,
    BaseSepolia,
}

impl EvmChain {
    pub fn chain_id(&self) -> u64 {
        match self {
            EvmChain::Ethereum => chains::ETHEREUM,
            EvmChain::Optimism => chains::OPTIMISM,
            EvmChain::Polygon => chains::POLYGON,
            EvmChain::Base => chains::BASE,
            EvmChain::Arbitrum => chains::ARBITRUM,
            EvmChain::EthereumSepolia => chains::SEPOLIA,
            EvmChain::BaseSepolia => chains::BASE_SEPOLIA,
        }
    }

    /// Chain name as the custody backend spells it
    pub fn name(&self) -> &'static str {
        match self {
            EvmChain::Ethereum => "ethereum",
            EvmChain::Optimism => "optimism",
            EvmChain::Polygon => "polygon",
            EvmChain::Base => "base",
            EvmChain::Arbitrum => "arbitrum",
            EvmChain::EthereumSepolia => "ethereum-sepolia",
            EvmChain::BaseSepolia => "base-sepolia",
        }
    }

    pub fn native_currency(&self) -> NativeCurrency {
        match self {
            EvmChain::Polygon => POL,
            _ => ETHER,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        [
            EvmChain::Ethereum,
            EvmChain::Optimism,
            EvmChain::Polygon,
            EvmChain::Base,
            EvmChain::Arbitrum,
            EvmChain::EthereumSepolia,
            EvmChain::BaseSepolia,
        ]
        .into_iter()
        .find(|c| c.chain_id() == chain_id)
    }
}

/// Native balance of an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Human-readable amount (e.g. "1.5")
    pub value: String,
    /// Raw amount in the smallest unit
    pub in_base_units: String,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
}

impl Balance {
    pub fn from_base_units(amount: U256, currency: NativeCurrency) -> Result<Self> {
        let formatted = alloy::primitives::utils::format_units(amount, currency.decimals)
            .map_err(|e| Error::InvalidResponse(format!("Cannot format balance: {}", e)))?;
        Ok(Self {
            value: trim_fraction(&formatted),
            in_base_units: amount.to_string(),
            decimals: currency.decimals,
            symbol: currency.symbol.to_string(),
            name: currency.name.to_string(),
        })
    }
}

/// Drop trailing fractional zeros: "1.500" becomes "1.5", "2.000" becomes "2"
fn trim_fraction(formatted: &str) -> String {
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => formatted.to_string(),
    }
}

/// Read-only EVM capability
#[async_trait]
pub trait EvmReader: Send + Sync {
    /// `eth_call` against `to` with raw calldata
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    async fn native_balance(&self, address: Address) -> Result<U256>;
}

/// Resolves human-readable names (ENS and similar) to addresses
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Address>;
}

/// `EvmReader` over an alloy HTTP provider, built once and reused per call
#[derive(Debug, Clone)]
pub struct AlloyEvmReader {
    provider: DynProvider,
}

impl AlloyEvmReader {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let rpc_url: url::Url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL: {}", e)))?;
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();
        Ok(Self { provider })
    }

    /// Create a reader from RPC config
    pub fn from_rpc_config(rpc_config: &crate::config::RpcConfig, chain: EvmChain) -> Result<Self> {
        let url = rpc_config.get(chain.chain_id()).ok_or_else(|| {
            Error::Config(format!("No RPC URL configured for chain {}", chain.name()))
        })?;
        Self::new(url)
    }
}

#[async_trait]
impl EvmReader for AlloyEvmReader {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::default().to(to).input(data.into());

        self.provider
            .call(tx)
            .await
            .map_err(|e| Error::Rpc(format!("eth_call failed: {}", e)))
    }

    async fn native_balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| Error::Rpc(format!("Failed to get balance: {}", e)))
    }
}

/// Read-only Solana capability
#[async_trait]
pub trait SolanaReader: Send + Sync {
    /// Balance in lamports
    async fn balance(&self, pubkey: &str) -> Result<u64>;

    /// Raw account info, `None` when the account does not exist
    async fn account_info(&self, pubkey: &str) -> Result<Option<Value>>;
}

/// `SolanaReader` over JSON-RPC
#[derive(Debug, Clone)]
pub struct SolanaRpcReader {
    client: Client,
    rpc_url: String,
}

impl SolanaRpcReader {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.into(),
        }
    }

    pub fn from_rpc_config(rpc_config: &crate::config::RpcConfig) -> Self {
        Self::new(rpc_config.solana())
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        rpc_result(method, body)
    }
}

/// Unwrap a JSON-RPC reply: an `error` member becomes `Error::Rpc`
fn rpc_result(method: &str, mut body: Value) -> Result<Value> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(Error::Rpc(format!("{} failed: {}", method, message)));
    }

    body.get_mut("result")
        .map(Value::take)
        .ok_or_else(|| Error::InvalidResponse(format!("{} returned no result", method)))
}

fn lamports(result: &Value) -> Result<u64> {
    result
        .get("value")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::InvalidResponse("getBalance returned no value".to_string()))
}

/// `None` when the account does not exist
fn account_value(mut result: Value) -> Option<Value> {
    match result.get_mut("value").map(Value::take) {
        None | Some(Value::Null) => None,
        value => value,
    }
}

#[async_trait]
impl SolanaReader for SolanaRpcReader {
    async fn balance(&self, pubkey: &str) -> Result<u64> {
        let result = self.rpc("getBalance", json!([pubkey])).await?;
        lamports(&result)
    }

    async fn account_info(&self, pubkey: &str) -> Result<Option<Value>> {
        let result = self
            .rpc("getAccountInfo", json!([pubkey, { "encoding": "base64" }]))
            .await?;
        Ok(account_value(result))
    }
}

/// Parse a 0x-prefixed EVM address
pub fn parse_evm_address(input: &str) -> Result<Address> {
    input
        .parse()
        .map_err(|e| Error::InvalidArgument(format!("Invalid EVM address {}: {}", input, e)))
}

/// Validate a base58 Solana public key (32 bytes)
pub fn parse_solana_pubkey(input: &str) -> Result<String> {
    let bytes = bs58::decode(input)
        .into_vec()
        .map_err(|e| Error::InvalidArgument(format!("Invalid Solana address {}: {}", input, e)))?;
    if bytes.len() != 32 {
        return Err(Error::InvalidArgument(format!(
            "Invalid Solana address {}: expected 32 bytes, got {}",
            input,
            bytes.len()
        )));
    }
    Ok(input.to_string())
}
