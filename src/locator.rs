//! Wallet locators
//!
//! The custody backend addresses every wallet by a locator string: either the
//! wallet's raw chain address, or a composite `<kind>:<value>:<wallet-type>`
//! built from a linked user identity (e.g. `email:user@x.com:evm-smart-wallet`).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wallet flavours offered by the custody backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalletType {
    EvmSmartWallet,
    EvmMpcWallet,
    SolanaSmartWallet,
    SolanaCustodialWallet,
}

impl WalletType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletType::EvmSmartWallet => "evm-smart-wallet",
            WalletType::EvmMpcWallet => "evm-mpc-wallet",
            WalletType::SolanaSmartWallet => "solana-smart-wallet",
            WalletType::SolanaCustodialWallet => "solana-custodial-wallet",
        }
    }
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a wallet belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WalletIdentity {
    Address(String),
    Email(String),
    Phone(String),
    UserId(String),
}

impl WalletIdentity {
    /// `<kind>:<value>` form used when linking a user at wallet creation.
    ///
    /// Returns `None` for raw addresses, which are not linked users.
    pub fn linked_user(&self) -> Option<String> {
        match self {
            WalletIdentity::Address(_) => None,
            WalletIdentity::Email(v) => Some(format!("email:{}", v)),
            WalletIdentity::Phone(v) => Some(format!("phoneNumber:{}", v)),
            WalletIdentity::UserId(v) => Some(format!("userId:{}", v)),
        }
    }
}

/// Untyped identity union, as it arrives from configuration or tool input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocatorParams {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl LocatorParams {
    /// Pick the identity, in order address > email > phone > user id.
    pub fn identity(&self) -> Result<WalletIdentity> {
        fn present(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        if let Some(address) = present(&self.address) {
            return Ok(WalletIdentity::Address(address));
        }
        if let Some(email) = present(&self.email) {
            return Ok(WalletIdentity::Email(email));
        }
        if let Some(phone) = present(&self.phone) {
            return Ok(WalletIdentity::Phone(phone));
        }
        if let Some(user_id) = present(&self.user_id) {
            return Ok(WalletIdentity::UserId(user_id));
        }

        Err(Error::Config(
            "A wallet address, email, phone or user id is required to locate a wallet".to_string(),
        ))
    }
}

/// Canonical remote wallet locator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletLocator(String);

impl WalletLocator {
    pub fn new(identity: &WalletIdentity, wallet_type: WalletType) -> Self {
        match identity {
            WalletIdentity::Address(address) => Self(address.clone()),
            other => {
                // linked_user is Some for every non-address identity
                let user = other.linked_user().unwrap_or_default();
                Self(format!("{}:{}", user, wallet_type))
            }
        }
    }

    pub fn from_params(params: &LocatorParams, wallet_type: WalletType) -> Result<Self> {
        Ok(Self::new(&params.identity()?, wallet_type))
    }

    /// Wrap a locator string that was already resolved elsewhere
    pub fn from_raw(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the locator is a bare chain address
    pub fn is_address(&self) -> bool {
        !self.0.contains(':')
    }
}

impl fmt::Display for WalletLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WalletLocator {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
