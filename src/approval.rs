//! Approval submission for non-custodial signers
//!
//! When a wallet's admin (or delegated) signer is a local keypair, the backend
//! parks new operations in `awaiting-approval` and hands back a challenge
//! message per required signer. The submitter signs the first pending
//! challenge and submits exactly one approval. It never loops: polling resumes
//! in the caller.

use crate::api::{
    Approval, PendingApproval, RemoteOperation, SignatureRecord, TransactionRecord,
    WalletsApiClient,
};
use crate::locator::WalletLocator;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Local signing capability used to answer approval challenges
#[async_trait]
pub trait ApprovalSigner: Send + Sync {
    /// Namespaced signer locator, e.g. `evm-keypair:0xabc`
    fn locator(&self) -> String;

    /// Sign a challenge message exactly as the backend delivered it
    async fn sign(&self, message: &str) -> Result<String>;
}

/// Who approves operations for a wallet
#[derive(Clone)]
pub enum SignerConfig {
    /// The custody backend signs on the owner's behalf; no local approval step
    Custodial,
    /// A local keypair approves every operation
    Keypair(Arc<dyn ApprovalSigner>),
}

impl SignerConfig {
    pub fn keypair(signer: impl ApprovalSigner + 'static) -> Self {
        SignerConfig::Keypair(Arc::new(signer))
    }

    /// Signer locator to put in request params, `None` when custodial
    pub fn locator(&self) -> Option<String> {
        match self {
            SignerConfig::Custodial => None,
            SignerConfig::Keypair(signer) => Some(signer.locator()),
        }
    }

    pub fn approval_signer(&self) -> Option<&dyn ApprovalSigner> {
        match self {
            SignerConfig::Custodial => None,
            SignerConfig::Keypair(signer) => Some(signer.as_ref()),
        }
    }

    pub fn is_custodial(&self) -> bool {
        matches!(self, SignerConfig::Custodial)
    }
}

impl std::fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignerConfig::Custodial => f.write_str("Custodial"),
            SignerConfig::Keypair(signer) => f.debug_tuple("Keypair").field(&signer.locator()).finish(),
        }
    }
}

pub struct ApprovalSubmitter<'a> {
    api: &'a WalletsApiClient,
    signer: &'a dyn ApprovalSigner,
}

impl<'a> ApprovalSubmitter<'a> {
    pub fn new(api: &'a WalletsApiClient, signer: &'a dyn ApprovalSigner) -> Self {
        Self { api, signer }
    }

    /// Sign the challenge and build the approval payload
    pub async fn approve(&self, pending: &PendingApproval) -> Result<Approval> {
        let locator = self.signer.locator();
        if pending.signer != locator {
            tracing::warn!(
                expected = %pending.signer,
                signer = %locator,
                "Pending approval names a different signer"
            );
        }

        let signature = self.signer.sign(&pending.message).await?;
        Ok(Approval {
            signer: locator,
            signature,
        })
    }

    /// Approve a transaction awaiting approval.
    ///
    /// Returns `None` when there is nothing to approve.
    pub async fn submit_for_transaction(
        &self,
        locator: &WalletLocator,
        record: &TransactionRecord,
    ) -> Result<Option<TransactionRecord>> {
        let Some(pending) = record.first_pending() else {
            return Ok(None);
        };

        let approval = self.approve(pending).await?;
        tracing::info!(id = %record.id, signer = %approval.signer, "Submitting transaction approval");
        let updated = self
            .api
            .submit_transaction_approval(locator, &record.id, &approval)
            .await?;
        Ok(Some(updated))
    }

    /// Approve a signature request awaiting approval.
    ///
    /// Returns `None` when there is nothing to approve.
    pub async fn submit_for_signature(
        &self,
        locator: &WalletLocator,
        record: &SignatureRecord,
    ) -> Result<Option<SignatureRecord>> {
        let Some(pending) = record.first_pending() else {
            return Ok(None);
        };

        let approval = self.approve(pending).await?;
        tracing::info!(id = %record.id, signer = %approval.signer, "Submitting signature approval");
        let updated = self
            .api
            .submit_signature_approval(locator, &record.id, &approval)
            .await?;
        Ok(Some(updated))
    }

    /// Approve a delegated signer registration.
    ///
    /// Registration challenges are answered through the signature approvals
    /// endpoint, keyed by the per-chain registration id.
    pub async fn submit_for_delegated_signer(
        &self,
        locator: &WalletLocator,
        registration_id: &str,
        pending: &PendingApproval,
    ) -> Result<SignatureRecord> {
        let approval = self.approve(pending).await?;
        tracing::info!(id = registration_id, signer = %approval.signer, "Approving delegated signer");
        self.api
            .submit_signature_approval(locator, registration_id, &approval)
            .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Signer that records every challenge and returns a canned signature
    pub struct RecordingSigner {
        pub locator: String,
        pub signature: String,
        pub seen: Mutex<Vec<String>>,
    }

    impl RecordingSigner {
        pub fn new(locator: &str, signature: &str) -> Arc<Self> {
            Arc::new(Self {
                locator: locator.to_string(),
                signature: signature.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ApprovalSigner for RecordingSigner {
        fn locator(&self) -> String {
            self.locator.clone()
        }

        async fn sign(&self, message: &str) -> Result<String> {
            self.seen.lock().unwrap().push(message.to_string());
            Ok(self.signature.clone())
        }
    }
}
