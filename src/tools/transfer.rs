//! Transaction-submitting tools
//!
//! SECURITY NOTE:
//! - These tools move funds; every call is logged with its recipient
//! - Approval and settlement happen through the wallet's custody pipeline

use super::types::{input_schema_for, parse_args};
use super::{Tool, TOOL_SEND_NATIVE_TOKEN, TOOL_SEND_SOLANA_TRANSACTION};
use crate::wallet::{EvmTransaction, EvmWalletClient, SolanaTransaction, SolanaWalletClient};
use crate::{Error, Result};
use alloy::primitives::utils::parse_ether;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SendNativeTokenInput {
    /// Recipient address or name
    pub to: String,
    /// Amount in whole native units (e.g. "0.01" ETH)
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SendSolanaTransactionInput {
    /// Serialized transaction, base58 encoded
    pub transaction: String,
}

pub struct SendNativeTokenTool {
    wallet: Arc<dyn EvmWalletClient>,
}

impl SendNativeTokenTool {
    pub fn new(wallet: Arc<dyn EvmWalletClient>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl Tool for SendNativeTokenTool {
    fn name(&self) -> &'static str {
        TOOL_SEND_NATIVE_TOKEN
    }

    fn description(&self) -> &'static str {
        "Send the chain's native token to an address. Amount is in whole units, not wei."
    }

    fn input_schema(&self) -> Value {
        input_schema_for::<SendNativeTokenInput>()
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let input: SendNativeTokenInput = parse_args(self.name(), args)?;
        let value = parse_ether(&input.amount).map_err(|e| {
            Error::InvalidArgument(format!("Invalid amount {}: {}", input.amount, e))
        })?;
        if value.is_zero() {
            return Err(Error::InvalidArgument("amount must be positive".to_string()));
        }

        tracing::info!(to = %input.to, amount = %input.amount, "Sending native token");
        let result = self
            .wallet
            .send_transaction(EvmTransaction::transfer(input.to, value))
            .await?;
        Ok(serde_json::to_value(result)?)
    }
}

pub struct SendSolanaTransactionTool {
    wallet: Arc<dyn SolanaWalletClient>,
}

impl SendSolanaTransactionTool {
    pub fn new(wallet: Arc<dyn SolanaWalletClient>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl Tool for SendSolanaTransactionTool {
    fn name(&self) -> &'static str {
        TOOL_SEND_SOLANA_TRANSACTION
    }

    fn description(&self) -> &'static str {
        "Submit a serialized (base58) Solana transaction from the wallet."
    }

    fn input_schema(&self) -> Value {
        input_schema_for::<SendSolanaTransactionInput>()
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let input: SendSolanaTransactionInput = parse_args(self.name(), args)?;
        let transaction = SolanaTransaction::new(input.transaction)?;

        tracing::info!(wallet = %self.wallet.address(), "Submitting Solana transaction");
        let result = self.wallet.send_transaction(transaction).await?;
        Ok(serde_json::to_value(result)?)
    }
}
