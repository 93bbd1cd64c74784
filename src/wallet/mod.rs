//! Wallet clients
//!
//! Every chain family exposes the same `WalletClient` surface; chain-specific
//! writes live on `EvmWalletClient` and `SolanaWalletClient`. `AnyWallet`
//! tags a client with its family so callers dispatch on the variant instead
//! of probing for methods.
//!
//! The custody-backed facades share one pipeline: create the remote operation,
//! answer the approval challenge when the signer is a local keypair, then poll
//! until the operation is terminal.

pub mod evm;
pub mod signer;
pub mod solana;

pub use evm::{EvmCall, EvmReadRequest, EvmSmartWallet, EvmTransaction};
pub use signer::{EvmKeypairSigner, SolanaKeypairSigner};
pub use solana::{SolanaCustodialWallet, SolanaSmartWallet, SolanaTransaction};

use crate::api::{
    AdminSigner, CreateSignatureRequest, IdempotencyKey, OperationStatus, RemoteOperation,
    SignatureRecord, TransactionRecord, WalletsApiClient,
};
use crate::approval::{ApprovalSubmitter, SignerConfig};
use crate::chain::{Balance, Chain};
use crate::locator::WalletLocator;
use crate::poller::PollOptions;
use crate::{Error, Result};
use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Normalized outcome of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// On-chain transaction id, empty when the backend has not reported one
    pub hash: String,
    pub status: OperationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureResult {
    pub signature: String,
}

/// Decoded result of a read-only contract call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    pub value: Value,
}

/// Capabilities shared by every chain family
#[async_trait]
pub trait WalletClient: Send + Sync {
    fn address(&self) -> String;

    fn chain(&self) -> Chain;

    async fn sign_message(&self, message: &str) -> Result<SignatureResult>;

    /// Native balance of `address` (an address, or a name where the chain resolves names)
    async fn balance_of(&self, address: &str) -> Result<Balance>;
}

#[async_trait]
pub trait EvmWalletClient: WalletClient {
    async fn send_transaction(&self, transaction: EvmTransaction) -> Result<TransactionResult>;

    async fn read(&self, request: EvmReadRequest) -> Result<ReadResult>;

    /// Sign EIP-712 typed data given as `{domain, types, primaryType, message}`
    async fn sign_typed_data(&self, typed_data: Value) -> Result<SignatureResult>;

    /// Resolve a hex address or a name to an address
    async fn resolve_address(&self, address: &str) -> Result<Address>;
}

#[async_trait]
pub trait SolanaWalletClient: WalletClient {
    async fn send_transaction(&self, transaction: SolanaTransaction) -> Result<TransactionResult>;
}

/// A wallet tagged with its chain family
#[derive(Clone)]
pub enum AnyWallet {
    Evm(Arc<dyn EvmWalletClient>),
    Solana(Arc<dyn SolanaWalletClient>),
    Aptos(Arc<dyn WalletClient>),
    Chromia(Arc<dyn WalletClient>),
}

impl AnyWallet {
    pub fn address(&self) -> String {
        match self {
            AnyWallet::Evm(w) => w.address(),
            AnyWallet::Solana(w) => w.address(),
            AnyWallet::Aptos(w) | AnyWallet::Chromia(w) => w.address(),
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            AnyWallet::Evm(w) => w.chain(),
            AnyWallet::Solana(w) => w.chain(),
            AnyWallet::Aptos(w) | AnyWallet::Chromia(w) => w.chain(),
        }
    }

    pub async fn sign_message(&self, message: &str) -> Result<SignatureResult> {
        match self {
            AnyWallet::Evm(w) => w.sign_message(message).await,
            AnyWallet::Solana(w) => w.sign_message(message).await,
            AnyWallet::Aptos(w) | AnyWallet::Chromia(w) => w.sign_message(message).await,
        }
    }

    pub async fn balance_of(&self, address: &str) -> Result<Balance> {
        match self {
            AnyWallet::Evm(w) => w.balance_of(address).await,
            AnyWallet::Solana(w) => w.balance_of(address).await,
            AnyWallet::Aptos(w) | AnyWallet::Chromia(w) => w.balance_of(address).await,
        }
    }

    pub fn as_evm(&self) -> Option<&Arc<dyn EvmWalletClient>> {
        match self {
            AnyWallet::Evm(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_solana(&self) -> Option<&Arc<dyn SolanaWalletClient>> {
        match self {
            AnyWallet::Solana(w) => Some(w),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AnyWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyWallet")
            .field("chain", &self.chain())
            .field("address", &self.address())
            .finish()
    }
}

/// Admin signer to request at wallet creation for a signer configuration
pub(crate) fn admin_signer(signer: &SignerConfig, chain: Chain) -> Result<AdminSigner> {
    let keypair_address = |prefix: &str| -> Result<String> {
        let locator = signer.locator().unwrap_or_default();
        locator
            .strip_prefix(prefix)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Config(format!("Admin signer {} is not a {} signer", locator, prefix))
            })
    };

    match (signer.is_custodial(), chain) {
        (true, Chain::Solana) => Ok(AdminSigner::SolanaFireblocksCustodial),
        (true, _) => Ok(AdminSigner::EvmFireblocksCustodial),
        (false, Chain::Solana) => Ok(AdminSigner::SolanaKeypair {
            address: keypair_address("solana-keypair:")?,
        }),
        (false, _) => Ok(AdminSigner::EvmKeypair {
            address: keypair_address("evm-keypair:")?,
        }),
    }
}

/// Create a transaction, approve it if needed, and poll it to a terminal state.
///
/// The terminal record is returned as is, including `failed`.
pub(crate) async fn run_transaction(
    api: &WalletsApiClient,
    locator: &WalletLocator,
    signer: &SignerConfig,
    params: Value,
    idempotency: Option<&IdempotencyKey>,
) -> Result<TransactionRecord> {
    let mut record = api.create_transaction(locator, params, idempotency).await?;

    if let Some(approval_signer) = signer.approval_signer() {
        if let Some(updated) = ApprovalSubmitter::new(api, approval_signer)
            .submit_for_transaction(locator, &record)
            .await?
        {
            record = updated;
        }
    }

    if record.status.is_terminal() {
        return Ok(record);
    }

    let options: PollOptions = api.poll_defaults().transaction;
    api.wait_for_transaction_after(locator, &record.id, options, record.status)
        .await
}

/// Signature counterpart of [`run_transaction`]
pub(crate) async fn run_signature(
    api: &WalletsApiClient,
    locator: &WalletLocator,
    signer: &SignerConfig,
    request: &CreateSignatureRequest,
) -> Result<SignatureRecord> {
    let mut record = api.create_signature(locator, request, None).await?;

    if let Some(approval_signer) = signer.approval_signer() {
        if let Some(updated) = ApprovalSubmitter::new(api, approval_signer)
            .submit_for_signature(locator, &record)
            .await?
        {
            record = updated;
        }
    }

    if record.status.is_terminal() {
        return Ok(record);
    }

    let options = api.poll_defaults().signature;
    api.wait_for_signature_after(locator, &record.id, options, record.status)
        .await
}

/// `failed` becomes `Error::TransactionFailed`; anything else is normalized
pub(crate) fn transaction_result(record: TransactionRecord) -> Result<TransactionResult> {
    if record.status == OperationStatus::Failed {
        tracing::error!(id = %record.id, "Transaction failed");
        return Err(Error::TransactionFailed {
            reason: record.failure_reason(),
            id: record.id,
        });
    }

    tracing::info!(id = %record.id, hash = %record.tx_hash(), "Transaction settled");
    Ok(TransactionResult {
        hash: record.tx_hash(),
        status: record.status,
    })
}

pub(crate) fn signature_result(record: SignatureRecord) -> Result<SignatureResult> {
    if record.status == OperationStatus::Failed {
        tracing::error!(id = %record.id, "Signature failed");
        return Err(Error::SignatureFailed {
            reason: record.failure_reason(),
            id: record.id,
        });
    }

    let signature = record.output_signature.ok_or_else(|| {
        Error::InvalidResponse(format!("Signature {} has no output signature", record.id))
    })?;
    Ok(SignatureResult { signature })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::testing::RecordingSigner;
    use serde_json::json;

    #[test]
    fn admin_signer_from_config() {
        assert_eq!(
            admin_signer(&SignerConfig::Custodial, Chain::Evm { id: 8453 }).unwrap(),
            AdminSigner::EvmFireblocksCustodial
        );
        assert_eq!(
            admin_signer(&SignerConfig::Custodial, Chain::Solana).unwrap(),
            AdminSigner::SolanaFireblocksCustodial
        );

        let evm = SignerConfig::Keypair(RecordingSigner::new("evm-keypair:0xabc", "sig"));
        assert_eq!(
            admin_signer(&evm, Chain::Evm { id: 1 }).unwrap(),
            AdminSigner::EvmKeypair {
                address: "0xabc".into()
            }
        );
        assert!(matches!(
            admin_signer(&evm, Chain::Solana),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn failed_transaction_is_an_error_with_its_id() {
        let record: TransactionRecord = serde_json::from_value(json!({
            "id": "tx1",
            "status": "failed",
            "error": { "message": "execution reverted" }
        }))
        .unwrap();

        match transaction_result(record).unwrap_err() {
            Error::TransactionFailed { id, reason } => {
                assert_eq!(id, "tx1");
                assert_eq!(reason, "execution reverted");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_tx_id_normalizes_to_empty_hash() {
        let record: TransactionRecord =
            serde_json::from_value(json!({ "id": "tx1", "status": "success" })).unwrap();
        let result = transaction_result(record).unwrap();
        assert_eq!(result.hash, "");
        assert_eq!(result.status, OperationStatus::Success);
    }

    #[test]
    fn signature_without_output_is_invalid() {
        let record: SignatureRecord =
            serde_json::from_value(json!({ "id": "s1", "status": "success" })).unwrap();
        assert!(matches!(
            signature_result(record),
            Err(Error::InvalidResponse(_))
        ));
    }
}
