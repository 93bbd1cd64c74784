//! Remote custody wallets API

mod client;
pub mod transport;
pub mod types;

pub use client::{IdempotencyKey, PollDefaults, WalletsApiClient};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{
    ActionRecord, ActionStatus, AdminSigner, Approval, Approvals, CreateSignatureRequest,
    CreateWalletRequest, DelegatedSignerRecord, OnChain, OperationStatus, PendingApproval,
    RegisterSignerRequest, RemoteOperation, SignatureRecord, SignatureType, SignerChainState,
    SubmittedApproval, TransactionRecord, WalletConfigRequest, WalletRecord,
};
