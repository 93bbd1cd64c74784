//! EVM smart wallet backed by the custody API
//!
//! Writes (call batches, message and typed-data signatures, delegated signer
//! registration) go through the custody backend. Reads go through an injected
//! `EvmReader`; names go through an injected `NameResolver`.

use super::{
    admin_signer, run_signature, run_transaction, signature_result, transaction_result,
    EvmWalletClient, ReadResult, SignatureResult, TransactionResult, WalletClient,
};
use crate::api::{
    CreateSignatureRequest, CreateWalletRequest, DelegatedSignerRecord, IdempotencyKey,
    OperationStatus, RegisterSignerRequest, RemoteOperation, SignatureType, TransactionRecord,
    WalletConfigRequest, WalletsApiClient,
};
use crate::approval::{ApprovalSubmitter, SignerConfig};
use crate::chain::{parse_evm_address, Balance, Chain, EvmChain, EvmReader, NameResolver};
use crate::locator::{WalletIdentity, WalletLocator, WalletType};
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

/// One call in a smart wallet batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmCall {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl EvmCall {
    /// Wire shape: value as a decimal string, data as 0x-hex
    fn to_params(&self) -> Value {
        json!({
            "to": self.to.to_string(),
            "value": self.value.to_string(),
            "data": self.data.to_string(),
        })
    }
}

/// A single transaction whose recipient may still be a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTransaction {
    pub to: String,
    pub value: U256,
    pub data: Bytes,
}

impl EvmTransaction {
    /// Native token transfer
    pub fn transfer(to: impl Into<String>, value: U256) -> Self {
        Self {
            to: to.into(),
            value,
            data: Bytes::new(),
        }
    }

    /// Contract call with pre-encoded calldata
    pub fn call(to: impl Into<String>, data: Bytes) -> Self {
        Self {
            to: to.into(),
            value: U256::ZERO,
            data,
        }
    }
}

/// `eth_call` request with pre-encoded calldata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmReadRequest {
    pub address: String,
    pub data: Bytes,
}

pub struct EvmSmartWallet {
    api: Arc<WalletsApiClient>,
    locator: WalletLocator,
    address: Address,
    chain: EvmChain,
    signer: SignerConfig,
    reader: Option<Arc<dyn EvmReader>>,
    resolver: Option<Arc<dyn NameResolver>>,
}

impl EvmSmartWallet {
    /// Wrap an existing wallet known by address
    pub fn new(
        api: Arc<WalletsApiClient>,
        address: Address,
        chain: EvmChain,
        signer: SignerConfig,
    ) -> Self {
        let locator = WalletLocator::new(
            &WalletIdentity::Address(address.to_string()),
            WalletType::EvmSmartWallet,
        );
        Self {
            api,
            locator,
            address,
            chain,
            signer,
            reader: None,
            resolver: None,
        }
    }

    /// Fetch the wallet for `identity`, creating it with `signer` as admin if absent
    pub async fn connect(
        api: Arc<WalletsApiClient>,
        identity: &WalletIdentity,
        chain: EvmChain,
        signer: SignerConfig,
    ) -> Result<Self> {
        let locator = WalletLocator::new(identity, WalletType::EvmSmartWallet);
        let request = CreateWalletRequest {
            wallet_type: WalletType::EvmSmartWallet,
            config: Some(WalletConfigRequest {
                admin_signer: admin_signer(&signer, Chain::Evm { id: chain.chain_id() })?,
            }),
            linked_user: identity.linked_user(),
        };

        let record = api.get_or_create_wallet(&locator, &request).await?;
        let address = parse_evm_address(&record.address)?;
        tracing::info!(locator = %locator, address = %address, chain = chain.name(), "Connected EVM smart wallet");

        Ok(Self {
            api,
            locator,
            address,
            chain,
            signer,
            reader: None,
            resolver: None,
        })
    }

    pub fn with_reader(mut self, reader: Arc<dyn EvmReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn locator(&self) -> &WalletLocator {
        &self.locator
    }

    pub fn evm_chain(&self) -> EvmChain {
        self.chain
    }

    fn reader(&self) -> Result<&dyn EvmReader> {
        self.reader.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "No EVM reader configured for {}",
                self.chain.name()
            ))
        })
    }

    fn transaction_params(&self, calls: &[EvmCall]) -> Value {
        let mut params = json!({
            "calls": calls.iter().map(EvmCall::to_params).collect::<Vec<_>>(),
            "chain": self.chain.name(),
        });
        if let Some(signer) = self.signer.locator() {
            params["signer"] = json!(signer);
        }
        params
    }

    /// Submit a call batch and return the terminal record, `failed` included
    pub async fn execute_transaction(
        &self,
        calls: Vec<EvmCall>,
        idempotency: Option<&IdempotencyKey>,
    ) -> Result<TransactionRecord> {
        if calls.is_empty() {
            return Err(Error::InvalidArgument("Call batch is empty".to_string()));
        }

        tracing::debug!(locator = %self.locator, calls = calls.len(), "Submitting EVM call batch");
        let params = self.transaction_params(&calls);
        run_transaction(&self.api, &self.locator, &self.signer, params, idempotency).await
    }

    /// Submit a call batch as one smart wallet transaction
    pub async fn send_calls(&self, calls: Vec<EvmCall>) -> Result<TransactionResult> {
        transaction_result(self.execute_transaction(calls, None).await?)
    }

    /// Register a delegated signer on this wallet's chain and wait for it to settle.
    ///
    /// With a keypair admin the registration challenge is approved locally.
    pub async fn add_delegated_signer(
        &self,
        signer: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<DelegatedSignerRecord> {
        let chain = self.chain.name();
        let request = RegisterSignerRequest {
            signer: signer.to_string(),
            chain: Some(chain.to_string()),
            expires_at,
        };
        let record = self
            .api
            .register_delegated_signer(&self.locator, &request)
            .await?;

        if let Some(approval_signer) = self.signer.approval_signer() {
            let pending = record.chains.get(chain).and_then(|state| {
                let id = state.id.as_deref()?;
                if state.status != OperationStatus::AwaitingApproval {
                    return None;
                }
                let approval = state.approvals.as_ref()?.pending.first()?;
                Some((id, approval))
            });

            if let Some((id, approval)) = pending {
                let approved = ApprovalSubmitter::new(&self.api, approval_signer)
                    .submit_for_delegated_signer(&self.locator, id, approval)
                    .await?;
                if approved.status == OperationStatus::Failed {
                    tracing::error!(id, signer, chain, "Delegated signer approval failed");
                    return Err(Error::TransactionFailed {
                        id: id.to_string(),
                        reason: approved.failure_reason(),
                    });
                }
            }
        }

        let options = self.api.poll_defaults().action;
        let record = self
            .api
            .wait_for_delegated_signer(&self.locator, signer, chain, options)
            .await?;

        if record.chain_status(chain) == Some(OperationStatus::Failed) {
            let id = record
                .chains
                .get(chain)
                .and_then(|state| state.id.clone())
                .unwrap_or_else(|| signer.to_string());
            return Err(Error::TransactionFailed {
                id,
                reason: format!("delegated signer registration on {} failed", chain),
            });
        }

        tracing::info!(signer, chain, "Delegated signer registered");
        Ok(record)
    }
}

impl std::fmt::Debug for EvmSmartWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmSmartWallet")
            .field("locator", &self.locator)
            .field("address", &self.address)
            .field("chain", &self.chain)
            .field("signer", &self.signer)
            .finish()
    }
}

#[async_trait]
impl WalletClient for EvmSmartWallet {
    fn address(&self) -> String {
        self.address.to_string()
    }

    fn chain(&self) -> Chain {
        Chain::Evm {
            id: self.chain.chain_id(),
        }
    }

    async fn sign_message(&self, message: &str) -> Result<SignatureResult> {
        let mut params = json!({
            "message": message,
            "chain": self.chain.name(),
        });
        if let Some(signer) = self.signer.locator() {
            params["signer"] = json!(signer);
        }

        let request = CreateSignatureRequest {
            signature_type: SignatureType::EvmMessage,
            params,
        };
        signature_result(run_signature(&self.api, &self.locator, &self.signer, &request).await?)
    }

    async fn balance_of(&self, address: &str) -> Result<Balance> {
        let address = self.resolve_address(address).await?;
        let amount = self.reader()?.native_balance(address).await?;
        Balance::from_base_units(amount, self.chain.native_currency())
    }
}

#[async_trait]
impl EvmWalletClient for EvmSmartWallet {
    async fn send_transaction(&self, transaction: EvmTransaction) -> Result<TransactionResult> {
        let to = self.resolve_address(&transaction.to).await?;
        self.send_calls(vec![EvmCall {
            to,
            value: transaction.value,
            data: transaction.data,
        }])
        .await
    }

    async fn read(&self, request: EvmReadRequest) -> Result<ReadResult> {
        let to = self.resolve_address(&request.address).await?;
        let output = self.reader()?.call(to, request.data).await?;
        Ok(ReadResult {
            value: Value::String(output.to_string()),
        })
    }

    async fn sign_typed_data(&self, typed_data: Value) -> Result<SignatureResult> {
        for field in ["domain", "types", "primaryType", "message"] {
            if typed_data.get(field).is_none() {
                return Err(Error::InvalidArgument(format!(
                    "Typed data is missing '{}'",
                    field
                )));
            }
        }

        let mut params = json!({
            "typedData": typed_data,
            "chain": self.chain.name(),
        });
        if let Some(signer) = self.signer.locator() {
            params["signer"] = json!(signer);
        }

        let request = CreateSignatureRequest {
            signature_type: SignatureType::EvmTypedData,
            params,
        };
        signature_result(run_signature(&self.api, &self.locator, &self.signer, &request).await?)
    }

    async fn resolve_address(&self, address: &str) -> Result<Address> {
        if address.starts_with("0x") {
            return parse_evm_address(address);
        }

        let resolver = self.resolver.as_deref().ok_or_else(|| {
            Error::Config(format!("No name resolver configured to resolve {}", address))
        })?;
        let resolved = resolver.resolve(address).await?;
        tracing::debug!(name = address, address = %resolved, "Resolved name");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::testing::ScriptedTransport;
    use crate::approval::testing::RecordingSigner;
    use crate::config::WalletsConfig;
    use crate::poller::PollOptions;
    use alloy::primitives::address;
    use std::time::Duration;
    use url::Url;

    const WALLET: Address = address!("0x1111111111111111111111111111111111111111");
    const RECIPIENT: Address = address!("0x2222222222222222222222222222222222222222");
    const BASE: &str = "/api/v1-alpha2/wallets/0x1111111111111111111111111111111111111111";

    fn api(transport: Arc<ScriptedTransport>) -> Arc<WalletsApiClient> {
        let fast = PollOptions::new(Duration::from_millis(100), 5);
        let config = WalletsConfig::new(
            "sk_test",
            Url::parse("https://api.example.com/api/v1-alpha2").unwrap(),
        )
        .with_transaction_poll(fast)
        .with_signature_poll(fast)
        .with_action_poll(fast);
        Arc::new(WalletsApiClient::with_transport(&config, transport).unwrap())
    }

    fn keypair_wallet(transport: Arc<ScriptedTransport>) -> (EvmSmartWallet, Arc<RecordingSigner>) {
        let signer = RecordingSigner::new("evm-keypair:0xabc", "0xsigned");
        let wallet = EvmSmartWallet::new(
            api(transport),
            WALLET,
            EvmChain::BaseSepolia,
            SignerConfig::Keypair(signer.clone()),
        );
        (wallet, signer)
    }

    struct FixedReader;

    #[async_trait]
    impl EvmReader for FixedReader {
        async fn call(&self, _to: Address, data: Bytes) -> Result<Bytes> {
            Ok(data)
        }

        async fn native_balance(&self, _address: Address) -> Result<U256> {
            Ok(U256::from(1_500_000_000_000_000_000u128))
        }
    }

    struct OneName;

    #[async_trait]
    impl NameResolver for OneName {
        async fn resolve(&self, name: &str) -> Result<Address> {
            match name {
                "alice.eth" => Ok(RECIPIENT),
                other => Err(Error::InvalidArgument(format!("unknown name {}", other))),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn send_transaction_approves_then_polls_to_success() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({
            "id": "tx1",
            "status": "awaiting-approval",
            "approvals": { "pending": [{ "signer": "evm-keypair:0xabc", "message": "deadbeef" }] }
        }));
        transport.push_ok(json!({ "id": "tx1", "status": "pending" }));
        transport.push_ok(json!({ "id": "tx1", "status": "pending" }));
        transport.push_ok(json!({ "id": "tx1", "status": "pending" }));
        transport.push_ok(json!({ "id": "tx1", "status": "success", "onChain": { "txId": "0xhash" } }));
        let (wallet, signer) = keypair_wallet(transport.clone());

        let result = wallet
            .send_transaction(EvmTransaction::transfer(RECIPIENT.to_string(), U256::from(1u64)))
            .await
            .unwrap();

        assert_eq!(
            result,
            TransactionResult {
                hash: "0xhash".into(),
                status: OperationStatus::Success
            }
        );
        assert_eq!(signer.seen(), vec!["deadbeef".to_string()]);

        let calls = transport.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], ("POST".into(), format!("{BASE}/transactions")));
        assert_eq!(calls[1], ("POST".into(), format!("{BASE}/transactions/tx1/approvals")));
        assert!(calls[2..]
            .iter()
            .all(|c| c == &("GET".to_string(), format!("{BASE}/transactions/tx1"))));

        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["params"]["chain"], "base-sepolia");
        assert_eq!(body["params"]["signer"], "evm-keypair:0xabc");
        assert_eq!(body["params"]["calls"][0]["value"], "1");
        assert_eq!(body["params"]["calls"][0]["data"], "0x");
    }

    #[tokio::test(start_paused = true)]
    async fn custodial_signer_skips_approval() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({ "id": "tx1", "status": "pending" }));
        transport.push_ok(json!({ "id": "tx1", "status": "success", "onChain": { "txId": "0xhash" } }));
        let wallet = EvmSmartWallet::new(
            api(transport.clone()),
            WALLET,
            EvmChain::Base,
            SignerConfig::Custodial,
        );

        let result = wallet
            .send_calls(vec![EvmCall {
                to: RECIPIENT,
                value: U256::ZERO,
                data: Bytes::from_static(&[0xa9, 0x05]),
            }])
            .await
            .unwrap();

        assert_eq!(result.hash, "0xhash");
        assert!(transport
            .calls()
            .iter()
            .all(|(_, path)| !path.ends_with("/approvals")));
        let body = transport.requests()[0].body.clone().unwrap();
        assert!(body["params"].get("signer").is_none());
        assert_eq!(body["params"]["calls"][0]["data"], "0xa905");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_transaction_raises_with_id() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({ "id": "tx1", "status": "pending" }));
        transport.push_ok(json!({ "id": "tx1", "status": "failed", "error": "reverted" }));
        let wallet = EvmSmartWallet::new(
            api(transport.clone()),
            WALLET,
            EvmChain::Base,
            SignerConfig::Custodial,
        );

        let err = wallet
            .send_transaction(EvmTransaction::transfer(RECIPIENT.to_string(), U256::from(5u64)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransactionFailed { ref id, .. } if id == "tx1"));
        assert!(err.to_string().contains("tx1"));
    }

    #[tokio::test(start_paused = true)]
    async fn execute_transaction_returns_failed_record() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({ "id": "tx1", "status": "failed" }));
        let wallet = EvmSmartWallet::new(
            api(transport.clone()),
            WALLET,
            EvmChain::Base,
            SignerConfig::Custodial,
        );

        let record = wallet
            .execute_transaction(
                vec![EvmCall {
                    to: RECIPIENT,
                    value: U256::ZERO,
                    data: Bytes::new(),
                }],
                Some(&IdempotencyKey::new("k1")),
            )
            .await
            .unwrap();

        assert_eq!(record.status, OperationStatus::Failed);
        // terminal on create, so no polling
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_before_any_request() {
        let transport = ScriptedTransport::new();
        let (wallet, _) = keypair_wallet(transport.clone());

        let err = wallet.send_calls(Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sign_message_with_keypair_approval() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({
            "id": "s1",
            "status": "awaiting-approval",
            "approvals": { "pending": [{ "signer": "evm-keypair:0xabc", "message": "0x1234" }] }
        }));
        transport.push_ok(json!({ "id": "s1", "status": "pending" }));
        transport.push_ok(json!({ "id": "s1", "status": "success", "outputSignature": "0xfinal" }));
        let (wallet, signer) = keypair_wallet(transport.clone());

        let result = wallet.sign_message("hello").await.unwrap();

        assert_eq!(result.signature, "0xfinal");
        assert_eq!(signer.seen(), vec!["0x1234".to_string()]);
        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["type"], "evm-message");
        assert_eq!(body["params"]["message"], "hello");
        assert_eq!(
            transport.calls()[1],
            ("POST".into(), format!("{BASE}/signatures/s1/approvals"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_signature_raises() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({ "id": "s1", "status": "failed" }));
        let wallet = EvmSmartWallet::new(
            api(transport),
            WALLET,
            EvmChain::Base,
            SignerConfig::Custodial,
        );

        let err = wallet.sign_message("hello").await.unwrap_err();
        assert!(matches!(err, Error::SignatureFailed { ref id, .. } if id == "s1"));
    }

    #[tokio::test(start_paused = true)]
    async fn sign_typed_data_sends_typed_payload() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({ "id": "s2", "status": "success", "outputSignature": "0xtyped" }));
        let wallet = EvmSmartWallet::new(
            api(transport.clone()),
            WALLET,
            EvmChain::Base,
            SignerConfig::Custodial,
        );

        let typed = json!({
            "domain": { "name": "Test", "chainId": 8453 },
            "types": { "Mail": [{ "name": "contents", "type": "string" }] },
            "primaryType": "Mail",
            "message": { "contents": "hi" }
        });
        let result = wallet.sign_typed_data(typed.clone()).await.unwrap();

        assert_eq!(result.signature, "0xtyped");
        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["type"], "evm-typed-data");
        assert_eq!(body["params"]["typedData"], typed);

        let err = wallet.sign_typed_data(json!({ "domain": {} })).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn balance_resolves_names_through_resolver() {
        let transport = ScriptedTransport::new();
        let wallet = EvmSmartWallet::new(
            api(transport.clone()),
            WALLET,
            EvmChain::Base,
            SignerConfig::Custodial,
        )
        .with_reader(Arc::new(FixedReader));

        let err = wallet.balance_of("alice.eth").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let wallet = wallet.with_resolver(Arc::new(OneName));
        let balance = wallet.balance_of("alice.eth").await.unwrap();
        assert_eq!(balance.value, "1.5");
        assert_eq!(balance.symbol, "ETH");
        assert_eq!(wallet.resolve_address("alice.eth").await.unwrap(), RECIPIENT);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn read_requires_reader() {
        let transport = ScriptedTransport::new();
        let wallet = EvmSmartWallet::new(
            api(transport),
            WALLET,
            EvmChain::Base,
            SignerConfig::Custodial,
        );
        let request = EvmReadRequest {
            address: RECIPIENT.to_string(),
            data: Bytes::from_static(&[0x70, 0xa0, 0x82, 0x31]),
        };

        assert!(matches!(
            wallet.read(request.clone()).await,
            Err(Error::Config(_))
        ));

        let wallet = wallet.with_reader(Arc::new(FixedReader));
        let result = wallet.read(request).await.unwrap();
        assert_eq!(result.value, json!("0x70a08231"));
    }

    #[tokio::test]
    async fn connect_creates_missing_wallet_with_keypair_admin() {
        let transport = ScriptedTransport::new();
        transport.push(404, json!({ "error": "not found" }));
        transport.push_ok(json!({
            "type": "evm-smart-wallet",
            "address": "0x1111111111111111111111111111111111111111"
        }));
        let signer = RecordingSigner::new("evm-keypair:0xabc", "0xsigned");

        let wallet = EvmSmartWallet::connect(
            api(transport.clone()),
            &WalletIdentity::Email("user@x.com".into()),
            EvmChain::BaseSepolia,
            SignerConfig::Keypair(signer),
        )
        .await
        .unwrap();

        assert_eq!(wallet.address(), WALLET.to_string());
        assert_eq!(wallet.locator().as_str(), "email:user@x.com:evm-smart-wallet");
        let body = transport.requests()[1].body.clone().unwrap();
        assert_eq!(
            body,
            json!({
                "type": "evm-smart-wallet",
                "config": { "adminSigner": { "type": "evm-keypair", "address": "0xabc" } },
                "linkedUser": "email:user@x.com"
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn add_delegated_signer_approves_registration() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({
            "signer": "evm-keypair:0xdelegate",
            "chains": {
                "base-sepolia": {
                    "id": "reg1",
                    "status": "awaiting-approval",
                    "approvals": { "pending": [{ "signer": "evm-keypair:0xabc", "message": "0xfeed" }] }
                }
            }
        }));
        transport.push_ok(json!({ "id": "reg1", "status": "pending" }));
        transport.push_ok(json!({
            "signer": "evm-keypair:0xdelegate",
            "chains": { "base-sepolia": { "id": "reg1", "status": "success" } }
        }));
        let (wallet, signer) = keypair_wallet(transport.clone());

        let record = wallet
            .add_delegated_signer("evm-keypair:0xdelegate", None)
            .await
            .unwrap();

        assert_eq!(record.chain_status("base-sepolia"), Some(OperationStatus::Success));
        assert_eq!(signer.seen(), vec!["0xfeed".to_string()]);
        let calls = transport.calls();
        assert_eq!(calls[0], ("POST".into(), format!("{BASE}/signers")));
        assert_eq!(calls[1], ("POST".into(), format!("{BASE}/signatures/reg1/approvals")));
        assert_eq!(
            calls[2],
            ("GET".into(), format!("{BASE}/signers/evm-keypair:0xdelegate"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_registration_approval_stops_before_polling() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({
            "signer": "evm-keypair:0xdelegate",
            "chains": {
                "base-sepolia": {
                    "id": "reg1",
                    "status": "awaiting-approval",
                    "approvals": { "pending": [{ "signer": "evm-keypair:0xabc", "message": "0xfeed" }] }
                }
            }
        }));
        transport.push_ok(json!({ "id": "reg1", "status": "failed", "error": "bad approval" }));
        let (wallet, _) = keypair_wallet(transport.clone());

        let err = wallet
            .add_delegated_signer("evm-keypair:0xdelegate", None)
            .await
            .unwrap_err();

        match err {
            Error::TransactionFailed { id, reason } => {
                assert_eq!(id, "reg1");
                assert_eq!(reason, "bad approval");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_registration_raises_with_registration_id() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({
            "signer": "evm-keypair:0xdelegate",
            "chains": { "base-sepolia": { "id": "reg1", "status": "pending" } }
        }));
        transport.push_ok(json!({
            "signer": "evm-keypair:0xdelegate",
            "chains": { "base-sepolia": { "id": "reg1", "status": "failed" } }
        }));
        let (wallet, signer) = keypair_wallet(transport.clone());

        let err = wallet
            .add_delegated_signer("evm-keypair:0xdelegate", None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TransactionFailed { ref id, .. } if id == "reg1"));
        assert!(signer.seen().is_empty());
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn signer_without_chain_state_settles_on_first_read() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({ "signer": "evm-keypair:0xdelegate" }));
        transport.push_ok(json!({ "signer": "evm-keypair:0xdelegate" }));
        let wallet = EvmSmartWallet::new(
            api(transport.clone()),
            WALLET,
            EvmChain::BaseSepolia,
            SignerConfig::Custodial,
        );

        let record = wallet
            .add_delegated_signer("evm-keypair:0xdelegate", None)
            .await
            .unwrap();

        assert!(record.chains.is_empty());
        let gets: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|(method, _)| method == "GET")
            .collect();
        assert_eq!(
            gets,
            vec![("GET".to_string(), format!("{BASE}/signers/evm-keypair:0xdelegate"))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn status_moving_back_after_approval_is_rejected() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({
            "id": "tx1",
            "status": "awaiting-approval",
            "approvals": { "pending": [{ "signer": "evm-keypair:0xabc", "message": "deadbeef" }] }
        }));
        transport.push_ok(json!({ "id": "tx1", "status": "pending" }));
        transport.push_ok(json!({ "id": "tx1", "status": "awaiting-approval" }));
        transport.push_ok(json!({ "id": "tx1", "status": "success", "onChain": { "txId": "0xhash" } }));
        let (wallet, _) = keypair_wallet(transport.clone());

        let err = wallet
            .send_transaction(EvmTransaction::transfer(RECIPIENT.to_string(), U256::from(1u64)))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidResponse(_)));
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(transport.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_operations_share_one_client() {
        let transport = ScriptedTransport::new();
        let other = "0x3333333333333333333333333333333333333333";
        let other_base = format!("/api/v1-alpha2/wallets/{other}");

        transport.route("POST", &format!("{BASE}/transactions"), json!({ "id": "a", "status": "pending" }));
        transport.route("GET", &format!("{BASE}/transactions/a"), json!({ "id": "a", "status": "success", "onChain": { "txId": "0xa" } }));
        transport.route("POST", &format!("{other_base}/transactions"), json!({ "id": "b", "status": "pending" }));
        transport.route("GET", &format!("{other_base}/transactions/b"), json!({ "id": "b", "status": "pending" }));
        transport.route("GET", &format!("{other_base}/transactions/b"), json!({ "id": "b", "status": "success", "onChain": { "txId": "0xb" } }));

        let api = api(transport.clone());
        let first = EvmSmartWallet::new(api.clone(), WALLET, EvmChain::Base, SignerConfig::Custodial);
        let second = EvmSmartWallet::new(
            api,
            other.parse().unwrap(),
            EvmChain::Base,
            SignerConfig::Custodial,
        );

        let (a, b) = futures::join!(
            first.send_transaction(EvmTransaction::transfer(RECIPIENT.to_string(), U256::from(1u64))),
            second.send_transaction(EvmTransaction::transfer(RECIPIENT.to_string(), U256::from(2u64))),
        );

        assert_eq!(a.unwrap().hash, "0xa");
        assert_eq!(b.unwrap().hash, "0xb");
        assert_eq!(transport.requests().len(), 5);
    }
}
