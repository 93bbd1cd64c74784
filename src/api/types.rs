//! Wire types for the custody wallets API
//!
//! Every response is decoded into one of these records. Decoding is strict:
//! an unknown status or a missing required field is an error, not a guess.

use crate::locator::WalletType;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Status of a transaction or signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationStatus {
    AwaitingApproval,
    Pending,
    Success,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Success | OperationStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            OperationStatus::AwaitingApproval => 0,
            OperationStatus::Pending => 1,
            OperationStatus::Success | OperationStatus::Failed => 2,
        }
    }

    /// Whether `next` is a legal observation after `self`.
    ///
    /// Statuses only move forward; a terminal status never changes.
    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::AwaitingApproval => "awaiting-approval",
            OperationStatus::Pending => "pending",
            OperationStatus::Success => "success",
            OperationStatus::Failed => "failed",
        }
    }
}

/// Status of a generic action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Succeeded,
    Failed,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Succeeded | ActionStatus::Failed)
    }
}

/// A challenge a signer still has to sign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub signer: String,
    pub message: String,
}

/// An approval the backend already accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedApproval {
    pub signer: String,
    pub signature: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Approvals {
    #[serde(default)]
    pub pending: Vec<PendingApproval>,
    #[serde(default)]
    pub submitted: Vec<SubmittedApproval>,
    #[serde(default)]
    pub required: Option<u32>,
}

impl Approvals {
    fn check_quorum(&self, status: OperationStatus, id: &str) -> Result<()> {
        if status != OperationStatus::Success {
            return Ok(());
        }
        if let Some(required) = self.required {
            if (self.submitted.len() as u64) < u64::from(required) {
                return Err(Error::InvalidResponse(format!(
                    "operation {} reported success with {} of {} required approvals",
                    id,
                    self.submitted.len(),
                    required
                )));
            }
        }
        Ok(())
    }
}

/// An approval to submit: a signer locator and its signature over the challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub signer: String,
    pub signature: String,
}

/// Settlement data, present once the transaction was broadcast
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChain {
    #[serde(default)]
    pub tx_id: Option<String>,
    #[serde(default)]
    pub user_operation_hash: Option<String>,
    #[serde(default)]
    pub explorer_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub status: OperationStatus,
    #[serde(default)]
    pub approvals: Option<Approvals>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub on_chain: Option<OnChain>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    pub id: String,
    pub status: OperationStatus,
    #[serde(default)]
    pub output_signature: Option<String>,
    #[serde(default)]
    pub approvals: Option<Approvals>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(default, alias = "actionId")]
    pub id: Option<String>,
    pub status: ActionStatus,
    #[serde(default)]
    pub data: Value,
}

/// Common view over records that carry approvals
pub trait RemoteOperation {
    fn id(&self) -> &str;
    fn status(&self) -> OperationStatus;
    fn approvals(&self) -> Option<&Approvals>;

    fn first_pending(&self) -> Option<&PendingApproval> {
        if self.status() != OperationStatus::AwaitingApproval {
            return None;
        }
        self.approvals().and_then(|a| a.pending.first())
    }

    /// Check the approval quorum invariant
    fn validate(&self) -> Result<()> {
        match self.approvals() {
            Some(approvals) => approvals.check_quorum(self.status(), self.id()),
            None => Ok(()),
        }
    }

    /// Human-readable failure reason, if the backend gave one
    fn failure_reason(&self) -> String;
}

fn describe_error(error: &Option<Value>) -> String {
    match error {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => map
            .get("message")
            .or_else(|| map.get("reason"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        Some(other) => other.to_string(),
        None => "no reason given".to_string(),
    }
}

impl RemoteOperation for TransactionRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> OperationStatus {
        self.status
    }

    fn approvals(&self) -> Option<&Approvals> {
        self.approvals.as_ref()
    }

    fn failure_reason(&self) -> String {
        describe_error(&self.error)
    }
}

impl RemoteOperation for SignatureRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> OperationStatus {
        self.status
    }

    fn approvals(&self) -> Option<&Approvals> {
        self.approvals.as_ref()
    }

    fn failure_reason(&self) -> String {
        describe_error(&self.error)
    }
}

impl TransactionRecord {
    /// On-chain transaction id, empty until broadcast
    pub fn tx_hash(&self) -> String {
        self.on_chain
            .as_ref()
            .and_then(|c| c.tx_id.clone())
            .unwrap_or_default()
    }
}

/// Wallet as returned by create/get
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    #[serde(rename = "type")]
    pub wallet_type: WalletType,
    pub address: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub linked_user: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Admin signer set at wallet creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AdminSigner {
    EvmKeypair { address: String },
    SolanaKeypair { address: String },
    EvmFireblocksCustodial,
    SolanaFireblocksCustodial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    #[serde(rename = "type")]
    pub wallet_type: WalletType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<WalletConfigRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfigRequest {
    pub admin_signer: AdminSigner,
}

/// What a signature request asks the wallet to sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureType {
    EvmMessage,
    EvmTypedData,
    SolanaMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSignatureRequest {
    #[serde(rename = "type")]
    pub signature_type: SignatureType,
    pub params: Value,
}

/// Per-chain registration state of a delegated signer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignerChainState {
    #[serde(default)]
    pub id: Option<String>,
    pub status: OperationStatus,
    #[serde(default)]
    pub approvals: Option<Approvals>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedSignerRecord {
    pub signer: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub chains: HashMap<String, SignerChainState>,
}

impl DelegatedSignerRecord {
    pub fn chain_status(&self, chain: &str) -> Option<OperationStatus> {
        self.chains.get(chain).map(|c| c.status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSignerRequest {
    pub signer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}
