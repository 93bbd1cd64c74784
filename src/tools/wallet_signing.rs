//! Wallet signing tools.
//!
//! SECURITY NOTE:
//! - Signing happens in the custody backend or through the wallet's signer
//! - Returns signatures only, never key material

use super::types::{input_schema_for, parse_args, AnyJson};
use super::{Tool, TOOL_SIGN_MESSAGE, TOOL_SIGN_TYPED_DATA};
use crate::wallet::{AnyWallet, EvmWalletClient};
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SignMessageInput {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SignTypedDataInput {
    /// EIP-712 payload: `domain`, `types`, `primaryType` and `message`
    pub typed_data: AnyJson,
}

pub struct SignMessageTool {
    wallet: AnyWallet,
}

impl SignMessageTool {
    pub fn new(wallet: AnyWallet) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl Tool for SignMessageTool {
    fn name(&self) -> &'static str {
        TOOL_SIGN_MESSAGE
    }

    fn description(&self) -> &'static str {
        "Sign a message with the wallet. Returns the signature."
    }

    fn input_schema(&self) -> Value {
        input_schema_for::<SignMessageInput>()
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let input: SignMessageInput = parse_args(self.name(), args)?;
        if input.message.is_empty() {
            return Err(Error::InvalidArgument("message must not be empty".to_string()));
        }

        let result = self.wallet.sign_message(&input.message).await?;
        Ok(json!({
            "address": self.wallet.address(),
            "signature": result.signature
        }))
    }
}

pub struct SignTypedDataTool {
    wallet: Arc<dyn EvmWalletClient>,
}

impl SignTypedDataTool {
    pub fn new(wallet: Arc<dyn EvmWalletClient>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl Tool for SignTypedDataTool {
    fn name(&self) -> &'static str {
        TOOL_SIGN_TYPED_DATA
    }

    fn description(&self) -> &'static str {
        "Sign EIP-712 typed data with the wallet. Returns the signature."
    }

    fn input_schema(&self) -> Value {
        input_schema_for::<SignTypedDataInput>()
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let input: SignTypedDataInput = parse_args(self.name(), args)?;
        let result = self.wallet.sign_typed_data(input.typed_data.into()).await?;
        Ok(json!({
            "address": self.wallet.address(),
            "signature": result.signature
        }))
    }
}
