//! Agent Wallets
//!
//! Multi-chain wallet clients for agents, backed by a remote custody API:
//! - Create remote operations (transactions, message and typed-data signatures)
//! - Answer approval challenges with a local keypair when the wallet requires it
//! - Poll operations to a terminal state within a bounded attempt budget
//! - Expose wallet capabilities as schema-described tools
//!
//! # Security Model
//!
//! - The API key lives in `WalletsConfig` and is redacted from all Debug output
//! - Private keys only exist inside `wallet::signer` and never leave it
//! - Custodial wallets never hold key material locally

pub mod api;
pub mod approval;
pub mod chain;
pub mod config;
pub mod locator;
pub mod logging;
pub mod poller;
pub mod tools;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use api::{IdempotencyKey, WalletsApiClient};
pub use approval::{ApprovalSigner, ApprovalSubmitter, SignerConfig};
pub use chain::{Balance, Chain, EvmChain};
pub use config::{RpcConfig, WalletsConfig, API_KEY_ENV};
pub use error::{Error, Result};
pub use locator::{LocatorParams, WalletIdentity, WalletLocator, WalletType};
pub use poller::{poll_until, OperationKind, PollOptions};
pub use tools::ToolRegistry;
pub use wallet::{
    AnyWallet, EvmSmartWallet, EvmWalletClient, SignatureResult, SolanaCustodialWallet,
    SolanaSmartWallet, SolanaWalletClient, TransactionResult, WalletClient,
};
