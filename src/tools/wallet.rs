//! Read-only wallet tools
//!
//! SECURITY NOTE:
//! - These tools never sign or submit anything
//! - The wallet address is public information

use super::types::{parse_args, EmptyArgs};
use super::{Tool, TOOL_GET_ADDRESS, TOOL_GET_BALANCE, TOOL_GET_CHAIN};
use crate::wallet::AnyWallet;
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub struct GetAddressTool {
    wallet: AnyWallet,
}

impl GetAddressTool {
    pub fn new(wallet: AnyWallet) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl Tool for GetAddressTool {
    fn name(&self) -> &'static str {
        TOOL_GET_ADDRESS
    }

    fn description(&self) -> &'static str {
        "Get the address of the wallet."
    }

    fn input_schema(&self) -> Value {
        super::types::input_schema_for::<EmptyArgs>()
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let _: EmptyArgs = parse_args(self.name(), args)?;
        Ok(json!({ "address": self.wallet.address() }))
    }
}

pub struct GetChainTool {
    wallet: AnyWallet,
}

impl GetChainTool {
    pub fn new(wallet: AnyWallet) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl Tool for GetChainTool {
    fn name(&self) -> &'static str {
        TOOL_GET_CHAIN
    }

    fn description(&self) -> &'static str {
        "Get the chain the wallet operates on."
    }

    fn input_schema(&self) -> Value {
        super::types::input_schema_for::<EmptyArgs>()
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let _: EmptyArgs = parse_args(self.name(), args)?;
        Ok(serde_json::to_value(self.wallet.chain())?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetBalanceInput {
    /// Address (or name, on chains that resolve names) to query.
    /// Defaults to the wallet's own address.
    #[serde(default)]
    pub address: Option<String>,
}

pub struct GetBalanceTool {
    wallet: AnyWallet,
}

impl GetBalanceTool {
    pub fn new(wallet: AnyWallet) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl Tool for GetBalanceTool {
    fn name(&self) -> &'static str {
        TOOL_GET_BALANCE
    }

    fn description(&self) -> &'static str {
        "Get the native token balance of an address. Read-only."
    }

    fn input_schema(&self) -> Value {
        super::types::input_schema_for::<GetBalanceInput>()
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let input: GetBalanceInput = parse_args(self.name(), args)?;
        let address = input.address.unwrap_or_else(|| self.wallet.address());
        let balance = self.wallet.balance_of(&address).await?;
        Ok(serde_json::to_value(balance)?)
    }
}
