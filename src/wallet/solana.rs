//! Solana wallets backed by the custody API
//!
//! Transactions are handed over already serialized (base58); this crate never
//! builds or encodes Solana transactions itself.

use super::{
    admin_signer, run_signature, run_transaction, signature_result, transaction_result,
    SignatureResult, SolanaWalletClient, TransactionResult, WalletClient,
};
use crate::api::{
    CreateSignatureRequest, CreateWalletRequest, IdempotencyKey, SignatureType,
    TransactionRecord, WalletConfigRequest, WalletsApiClient,
};
use crate::approval::SignerConfig;
use crate::chain::{parse_solana_pubkey, Balance, Chain, SolanaReader, SOL};
use crate::locator::{WalletIdentity, WalletLocator, WalletType};
use crate::{Error, Result};
use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// A fully serialized Solana transaction, base58 encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolanaTransaction {
    pub serialized: String,
}

impl SolanaTransaction {
    pub fn new(serialized: impl Into<String>) -> Result<Self> {
        let serialized = serialized.into();
        let bytes = bs58::decode(&serialized).into_vec().map_err(|e| {
            Error::InvalidArgument(format!("Transaction is not valid base58: {}", e))
        })?;
        if bytes.is_empty() {
            return Err(Error::InvalidArgument("Transaction is empty".to_string()));
        }
        Ok(Self { serialized })
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            serialized: bs58::encode(bytes).into_string(),
        }
    }
}

/// State and pipeline shared by both Solana wallet kinds
struct SolanaWallet {
    api: Arc<WalletsApiClient>,
    locator: WalletLocator,
    address: String,
    signer: SignerConfig,
    reader: Option<Arc<dyn SolanaReader>>,
}

impl SolanaWallet {
    fn new(
        api: Arc<WalletsApiClient>,
        address: &str,
        wallet_type: WalletType,
        signer: SignerConfig,
    ) -> Result<Self> {
        let address = parse_solana_pubkey(address)?;
        Ok(Self {
            api,
            locator: WalletLocator::new(&WalletIdentity::Address(address.clone()), wallet_type),
            address,
            signer,
            reader: None,
        })
    }

    async fn connect(
        api: Arc<WalletsApiClient>,
        identity: &WalletIdentity,
        wallet_type: WalletType,
        signer: SignerConfig,
    ) -> Result<Self> {
        let locator = WalletLocator::new(identity, wallet_type);
        let config = match wallet_type {
            WalletType::SolanaSmartWallet => Some(WalletConfigRequest {
                admin_signer: admin_signer(&signer, Chain::Solana)?,
            }),
            _ => None,
        };
        let request = CreateWalletRequest {
            wallet_type,
            config,
            linked_user: identity.linked_user(),
        };

        let record = api.get_or_create_wallet(&locator, &request).await?;
        let address = parse_solana_pubkey(&record.address)?;
        tracing::info!(locator = %locator, address = %address, %wallet_type, "Connected Solana wallet");

        Ok(Self {
            api,
            locator,
            address,
            signer,
            reader: None,
        })
    }

    async fn execute(
        &self,
        transaction: SolanaTransaction,
        idempotency: Option<&IdempotencyKey>,
    ) -> Result<TransactionRecord> {
        let mut params = json!({ "transaction": transaction.serialized });
        if let Some(signer) = self.signer.locator() {
            params["signer"] = json!(signer);
        }
        run_transaction(&self.api, &self.locator, &self.signer, params, idempotency).await
    }

    async fn balance_of(&self, address: &str) -> Result<Balance> {
        let address = parse_solana_pubkey(address)?;
        let reader = self
            .reader
            .as_deref()
            .ok_or_else(|| Error::Config("No Solana reader configured".to_string()))?;
        let lamports = reader.balance(&address).await?;
        Balance::from_base_units(U256::from(lamports), SOL)
    }
}

/// Solana wallet whose key is held by the custody backend
pub struct SolanaCustodialWallet {
    inner: SolanaWallet,
}

impl SolanaCustodialWallet {
    pub fn new(api: Arc<WalletsApiClient>, address: &str) -> Result<Self> {
        Ok(Self {
            inner: SolanaWallet::new(
                api,
                address,
                WalletType::SolanaCustodialWallet,
                SignerConfig::Custodial,
            )?,
        })
    }

    pub async fn connect(api: Arc<WalletsApiClient>, identity: &WalletIdentity) -> Result<Self> {
        Ok(Self {
            inner: SolanaWallet::connect(
                api,
                identity,
                WalletType::SolanaCustodialWallet,
                SignerConfig::Custodial,
            )
            .await?,
        })
    }

    pub fn with_reader(mut self, reader: Arc<dyn SolanaReader>) -> Self {
        self.inner.reader = Some(reader);
        self
    }

    pub fn locator(&self) -> &WalletLocator {
        &self.inner.locator
    }

    /// Submit a transaction and return the terminal record, `failed` included
    pub async fn execute_transaction(
        &self,
        transaction: SolanaTransaction,
        idempotency: Option<&IdempotencyKey>,
    ) -> Result<TransactionRecord> {
        self.inner.execute(transaction, idempotency).await
    }
}

#[async_trait]
impl WalletClient for SolanaCustodialWallet {
    fn address(&self) -> String {
        self.inner.address.clone()
    }

    fn chain(&self) -> Chain {
        Chain::Solana
    }

    async fn sign_message(&self, message: &str) -> Result<SignatureResult> {
        let request = CreateSignatureRequest {
            signature_type: SignatureType::SolanaMessage,
            params: json!({ "message": message }),
        };
        let record = run_signature(
            &self.inner.api,
            &self.inner.locator,
            &self.inner.signer,
            &request,
        )
        .await?;
        signature_result(record)
    }

    async fn balance_of(&self, address: &str) -> Result<Balance> {
        self.inner.balance_of(address).await
    }
}

#[async_trait]
impl SolanaWalletClient for SolanaCustodialWallet {
    async fn send_transaction(&self, transaction: SolanaTransaction) -> Result<TransactionResult> {
        transaction_result(self.inner.execute(transaction, None).await?)
    }
}

/// Solana smart wallet governed by an admin signer
pub struct SolanaSmartWallet {
    inner: SolanaWallet,
}

impl SolanaSmartWallet {
    pub fn new(api: Arc<WalletsApiClient>, address: &str, signer: SignerConfig) -> Result<Self> {
        Ok(Self {
            inner: SolanaWallet::new(api, address, WalletType::SolanaSmartWallet, signer)?,
        })
    }

    pub async fn connect(
        api: Arc<WalletsApiClient>,
        identity: &WalletIdentity,
        signer: SignerConfig,
    ) -> Result<Self> {
        Ok(Self {
            inner: SolanaWallet::connect(api, identity, WalletType::SolanaSmartWallet, signer)
                .await?,
        })
    }

    pub fn with_reader(mut self, reader: Arc<dyn SolanaReader>) -> Self {
        self.inner.reader = Some(reader);
        self
    }

    pub fn locator(&self) -> &WalletLocator {
        &self.inner.locator
    }

    pub async fn execute_transaction(
        &self,
        transaction: SolanaTransaction,
        idempotency: Option<&IdempotencyKey>,
    ) -> Result<TransactionRecord> {
        self.inner.execute(transaction, idempotency).await
    }

    /// Raw account info of the wallet itself
    pub async fn account_info(&self) -> Result<Option<Value>> {
        let reader = self
            .inner
            .reader
            .as_deref()
            .ok_or_else(|| Error::Config("No Solana reader configured".to_string()))?;
        reader.account_info(&self.inner.address).await
    }
}

#[async_trait]
impl WalletClient for SolanaSmartWallet {
    fn address(&self) -> String {
        self.inner.address.clone()
    }

    fn chain(&self) -> Chain {
        Chain::Solana
    }

    async fn sign_message(&self, _message: &str) -> Result<SignatureResult> {
        Err(Error::Unsupported(
            "Solana smart wallets do not support message signing".to_string(),
        ))
    }

    async fn balance_of(&self, address: &str) -> Result<Balance> {
        self.inner.balance_of(address).await
    }
}

#[async_trait]
impl SolanaWalletClient for SolanaSmartWallet {
    async fn send_transaction(&self, transaction: SolanaTransaction) -> Result<TransactionResult> {
        transaction_result(self.inner.execute(transaction, None).await?)
    }
}

impl std::fmt::Debug for SolanaCustodialWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaCustodialWallet")
            .field("locator", &self.inner.locator)
            .finish()
    }
}

impl std::fmt::Debug for SolanaSmartWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaSmartWallet")
            .field("locator", &self.inner.locator)
            .field("signer", &self.inner.signer)
            .finish()
    }
}
