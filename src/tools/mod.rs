//! Tool catalog for agent frameworks
//!
//! Each tool describes its input with a JSON Schema generated from a typed
//! input struct, and is called with untyped JSON arguments. `ToolRegistry`
//! picks the tools a wallet's chain family supports.

mod transfer;
mod types;
mod wallet;
mod wallet_signing;

use crate::wallet::AnyWallet;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub use transfer::{
    SendNativeTokenInput, SendNativeTokenTool, SendSolanaTransactionInput,
    SendSolanaTransactionTool,
};
pub use types::{input_schema_for, parse_args, AnyJson, EmptyArgs};
pub use wallet::{GetAddressTool, GetBalanceInput, GetBalanceTool, GetChainTool};
pub use wallet_signing::{SignMessageInput, SignMessageTool, SignTypedDataInput, SignTypedDataTool};

pub const TOOL_GET_ADDRESS: &str = "wallet/get_address";
pub const TOOL_GET_CHAIN: &str = "wallet/get_chain";
pub const TOOL_GET_BALANCE: &str = "wallet/get_balance";
pub const TOOL_SIGN_MESSAGE: &str = "wallet/sign_message";
pub const TOOL_SIGN_TYPED_DATA: &str = "wallet/sign_typed_data";
pub const TOOL_SEND_NATIVE_TOKEN: &str = "wallet/send_native_token";
pub const TOOL_SEND_SOLANA_TRANSACTION: &str = "wallet/send_solana_transaction";

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of the arguments `call` accepts
    fn input_schema(&self) -> Value;

    async fn call(&self, args: Value) -> Result<Value>;
}

/// What an agent framework needs to expose a tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tools supported by the wallet's chain family
    pub fn for_wallet(wallet: &AnyWallet) -> Self {
        let mut registry = Self::new();
        registry.register(GetAddressTool::new(wallet.clone()));
        registry.register(GetChainTool::new(wallet.clone()));
        registry.register(GetBalanceTool::new(wallet.clone()));
        registry.register(SignMessageTool::new(wallet.clone()));

        match wallet {
            AnyWallet::Evm(evm) => {
                registry.register(SignTypedDataTool::new(evm.clone()));
                registry.register(SendNativeTokenTool::new(evm.clone()));
            }
            AnyWallet::Solana(solana) => {
                registry.register(SendSolanaTransactionTool::new(solana.clone()));
            }
            AnyWallet::Aptos(_) | AnyWallet::Chromia(_) => {}
        }

        tracing::debug!(chain = wallet.chain().family(), tools = registry.tools.len(), "Registered wallet tools");
        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.input_schema(),
            })
            .collect()
    }

    pub async fn call(&self, name: &str, args: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown tool: {}", name)))?;

        tracing::debug!(tool = name, "Calling tool");
        tool.call(args).await.inspect_err(|e| {
            tracing::warn!(tool = name, error = %e, "Tool call failed");
        })
    }
}
