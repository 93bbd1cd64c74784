//! Custody wallets API client
//!
//! One `WalletsApiClient` is built from `WalletsConfig` and shared (behind an
//! `Arc`) by every wallet facade. It never retries: a non-2xx response becomes
//! `Error::RemoteApi` immediately. The `wait_for_*` helpers poll read-only
//! endpoints and hand back the terminal record, including failed ones.

use super::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use super::types::{
    ActionRecord, Approval, CreateSignatureRequest, CreateWalletRequest, DelegatedSignerRecord,
    OperationStatus, RegisterSignerRequest, RemoteOperation, SignatureRecord, TransactionRecord,
    WalletRecord,
};
use crate::config::WalletsConfig;
use crate::locator::WalletLocator;
use crate::poller::{poll_until, OperationKind, PollOptions};
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use url::Url;
use uuid::Uuid;

const API_KEY_HEADER: &str = "x-api-key";
const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// Optional deduplication token for create endpoints.
///
/// Without one, calling a create endpoint twice creates two independent remote
/// operations, so create calls must not be retried blindly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Poll budgets taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct PollDefaults {
    pub transaction: PollOptions,
    pub signature: PollOptions,
    pub action: PollOptions,
}

pub struct WalletsApiClient {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    api_key: SecretString,
    extra_headers: HeaderMap,
    poll: PollDefaults,
}

impl WalletsApiClient {
    /// Create a client using the default reqwest transport
    pub fn new(config: &WalletsConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(ReqwestTransport::default()))
    }

    pub fn with_transport(config: &WalletsConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        if config.base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Base URL {} cannot carry a path",
                config.base_url
            )));
        }

        let mut extra_headers = HeaderMap::new();
        for (name, value) in &config.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("Invalid header value for {}: {}", name, e)))?;
            extra_headers.insert(name, value);
        }

        Ok(Self {
            transport,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            extra_headers,
            poll: PollDefaults {
                transaction: config.transaction_poll.into(),
                signature: config.signature_poll.into(),
                action: config.action_poll.into(),
            },
        })
    }

    pub fn poll_defaults(&self) -> PollDefaults {
        self.poll
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn headers(&self, idempotency: Option<&IdempotencyKey>) -> Result<HeaderMap> {
        let mut headers = self.extra_headers.clone();

        let mut key = HeaderValue::from_str(self.api_key.expose_secret())
            .map_err(|_| Error::Config("API key is not a valid header value".to_string()))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(idempotency) = idempotency {
            let value = HeaderValue::from_str(idempotency.as_str())
                .map_err(|_| Error::InvalidArgument("Invalid idempotency key".to_string()))?;
            headers.insert(IDEMPOTENCY_HEADER, value);
        }

        Ok(headers)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
        idempotency: Option<&IdempotencyKey>,
        context: &'static str,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        let headers = self.headers(idempotency)?;

        tracing::debug!(method = %method, path = url.path(), context, "Wallets API request");

        let response = self
            .transport
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .await?;

        if !response.is_success() {
            tracing::warn!(status = response.status, context, "Wallets API request failed");
            return Err(Error::remote_api(response.status, &response.body));
        }

        serde_json::from_str(&response.body).map_err(|source| Error::Decode { context, source })
    }

    fn checked<T: RemoteOperation>(record: T) -> Result<T> {
        record.validate()?;
        Ok(record)
    }

    // ------------------------------------------------------------------
    // Wallets
    // ------------------------------------------------------------------

    pub async fn create_wallet(
        &self,
        request: &CreateWalletRequest,
        idempotency: Option<&IdempotencyKey>,
    ) -> Result<WalletRecord> {
        let body = serde_json::to_value(request)?;
        let wallet: WalletRecord = self
            .request(Method::POST, &["wallets"], Some(body), idempotency, "create wallet")
            .await?;
        tracing::info!(address = %wallet.address, wallet_type = %wallet.wallet_type, "Created wallet");
        Ok(wallet)
    }

    pub async fn get_wallet(&self, locator: &WalletLocator) -> Result<WalletRecord> {
        self.request(
            Method::GET,
            &["wallets", locator.as_str()],
            None,
            None,
            "get wallet",
        )
        .await
    }

    /// Fetch the wallet, creating it when the backend reports 404
    pub async fn get_or_create_wallet(
        &self,
        locator: &WalletLocator,
        request: &CreateWalletRequest,
    ) -> Result<WalletRecord> {
        match self.get_wallet(locator).await {
            Ok(wallet) => Ok(wallet),
            Err(e) if e.remote_status() == Some(404) => {
                tracing::info!(locator = %locator, "Wallet not found, creating it");
                self.create_wallet(request, None).await
            }
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Create a transaction. `params` is the chain-specific payload
    /// (an EVM call batch or a base58 Solana transaction).
    pub async fn create_transaction(
        &self,
        locator: &WalletLocator,
        params: Value,
        idempotency: Option<&IdempotencyKey>,
    ) -> Result<TransactionRecord> {
        let record: TransactionRecord = self
            .request(
                Method::POST,
                &["wallets", locator.as_str(), "transactions"],
                Some(json!({ "params": params })),
                idempotency,
                "create transaction",
            )
            .await?;
        tracing::info!(id = %record.id, status = record.status.as_str(), "Created transaction");
        Self::checked(record)
    }

    pub async fn get_transaction(
        &self,
        locator: &WalletLocator,
        id: &str,
    ) -> Result<TransactionRecord> {
        let record = self
            .request(
                Method::GET,
                &["wallets", locator.as_str(), "transactions", id],
                None,
                None,
                "get transaction",
            )
            .await?;
        Self::checked(record)
    }

    pub async fn submit_transaction_approval(
        &self,
        locator: &WalletLocator,
        id: &str,
        approval: &Approval,
    ) -> Result<TransactionRecord> {
        let record = self
            .request(
                Method::POST,
                &["wallets", locator.as_str(), "transactions", id, "approvals"],
                Some(json!({ "approvals": [approval] })),
                None,
                "submit transaction approval",
            )
            .await?;
        Self::checked(record)
    }

    // ------------------------------------------------------------------
    // Signatures
    // ------------------------------------------------------------------

    pub async fn create_signature(
        &self,
        locator: &WalletLocator,
        request: &CreateSignatureRequest,
        idempotency: Option<&IdempotencyKey>,
    ) -> Result<SignatureRecord> {
        let body = serde_json::to_value(request)?;
        let record: SignatureRecord = self
            .request(
                Method::POST,
                &["wallets", locator.as_str(), "signatures"],
                Some(body),
                idempotency,
                "create signature",
            )
            .await?;
        tracing::info!(id = %record.id, status = record.status.as_str(), "Created signature request");
        Self::checked(record)
    }

    pub async fn get_signature(&self, locator: &WalletLocator, id: &str) -> Result<SignatureRecord> {
        let record = self
            .request(
                Method::GET,
                &["wallets", locator.as_str(), "signatures", id],
                None,
                None,
                "get signature",
            )
            .await?;
        Self::checked(record)
    }

    pub async fn submit_signature_approval(
        &self,
        locator: &WalletLocator,
        id: &str,
        approval: &Approval,
    ) -> Result<SignatureRecord> {
        let record = self
            .request(
                Method::POST,
                &["wallets", locator.as_str(), "signatures", id, "approvals"],
                Some(json!({ "approvals": [approval] })),
                None,
                "submit signature approval",
            )
            .await?;
        Self::checked(record)
    }

    // ------------------------------------------------------------------
    // Delegated signers
    // ------------------------------------------------------------------

    pub async fn register_delegated_signer(
        &self,
        locator: &WalletLocator,
        request: &RegisterSignerRequest,
    ) -> Result<DelegatedSignerRecord> {
        let body = serde_json::to_value(request)?;
        self.request(
            Method::POST,
            &["wallets", locator.as_str(), "signers"],
            Some(body),
            None,
            "register delegated signer",
        )
        .await
    }

    pub async fn get_delegated_signer(
        &self,
        locator: &WalletLocator,
        signer: &str,
    ) -> Result<DelegatedSignerRecord> {
        self.request(
            Method::GET,
            &["wallets", locator.as_str(), "signers", signer],
            None,
            None,
            "get delegated signer",
        )
        .await
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    pub async fn get_action(&self, id: &str) -> Result<ActionRecord> {
        self.request(Method::GET, &["actions", id], None, None, "get action")
            .await
    }

    // ------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------

    /// Poll a transaction until `success` or `failed`.
    ///
    /// A failed transaction is returned as a value.
    pub async fn wait_for_transaction(
        &self,
        locator: &WalletLocator,
        id: &str,
        options: PollOptions,
    ) -> Result<TransactionRecord> {
        self.poll_transaction(locator, id, options, None).await
    }

    /// Like [`Self::wait_for_transaction`], rejecting any read that moves
    /// backwards from `observed`, the status already seen for `id`
    pub async fn wait_for_transaction_after(
        &self,
        locator: &WalletLocator,
        id: &str,
        options: PollOptions,
        observed: OperationStatus,
    ) -> Result<TransactionRecord> {
        self.poll_transaction(locator, id, options, Some(observed))
            .await
    }

    async fn poll_transaction(
        &self,
        locator: &WalletLocator,
        id: &str,
        options: PollOptions,
        observed: Option<OperationStatus>,
    ) -> Result<TransactionRecord> {
        let last = Mutex::new(observed);
        let last = &last;

        poll_until(
            OperationKind::Transaction,
            id,
            options,
            move || async move {
                let record = self.get_transaction(locator, id).await?;
                observe_status(last, OperationKind::Transaction, id, record.status)?;
                Ok(record)
            },
            |record: &TransactionRecord| record.status.is_terminal(),
        )
        .await
    }

    /// Poll a signature until `success` or `failed`.
    ///
    /// A failed signature is returned as a value.
    pub async fn wait_for_signature(
        &self,
        locator: &WalletLocator,
        id: &str,
        options: PollOptions,
    ) -> Result<SignatureRecord> {
        self.poll_signature(locator, id, options, None).await
    }

    /// Signature counterpart of [`Self::wait_for_transaction_after`]
    pub async fn wait_for_signature_after(
        &self,
        locator: &WalletLocator,
        id: &str,
        options: PollOptions,
        observed: OperationStatus,
    ) -> Result<SignatureRecord> {
        self.poll_signature(locator, id, options, Some(observed))
            .await
    }

    async fn poll_signature(
        &self,
        locator: &WalletLocator,
        id: &str,
        options: PollOptions,
        observed: Option<OperationStatus>,
    ) -> Result<SignatureRecord> {
        let last = Mutex::new(observed);
        let last = &last;

        poll_until(
            OperationKind::Signature,
            id,
            options,
            move || async move {
                let record = self.get_signature(locator, id).await?;
                observe_status(last, OperationKind::Signature, id, record.status)?;
                Ok(record)
            },
            |record: &SignatureRecord| record.status.is_terminal(),
        )
        .await
    }

    /// Poll an action until `succeeded` or `failed`
    pub async fn wait_for_action(&self, id: &str, options: PollOptions) -> Result<ActionRecord> {
        poll_until(
            OperationKind::Action,
            id,
            options,
            move || self.get_action(id),
            |record: &ActionRecord| record.status.is_terminal(),
        )
        .await
    }

    /// Poll a delegated signer until its registration on `chain` is terminal.
    ///
    /// Signers without per-chain state (e.g. Solana) are terminal on first read.
    pub async fn wait_for_delegated_signer(
        &self,
        locator: &WalletLocator,
        signer: &str,
        chain: &str,
        options: PollOptions,
    ) -> Result<DelegatedSignerRecord> {
        poll_until(
            OperationKind::DelegatedSigner,
            signer,
            options,
            move || self.get_delegated_signer(locator, signer),
            |record: &DelegatedSignerRecord| {
                record
                    .chain_status(chain)
                    .map_or(true, |status| status.is_terminal())
            },
        )
        .await
    }
}

impl std::fmt::Debug for WalletsApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletsApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Reject a status that moves backwards between two reads of one operation
fn observe_status(
    last: &Mutex<Option<OperationStatus>>,
    kind: OperationKind,
    id: &str,
    next: OperationStatus,
) -> Result<()> {
    let mut last = last
        .lock()
        .map_err(|_| Error::InvalidResponse("status tracker poisoned".to_string()))?;

    if let Some(previous) = *last {
        if !previous.can_transition_to(next) {
            return Err(Error::InvalidResponse(format!(
                "{} {} moved from {} to {}",
                kind,
                id,
                previous.as_str(),
                next.as_str()
            )));
        }
    }

    *last = Some(next);
    Ok(())
}
