//! Local keypair signers
//!
//! SECURITY: these are the only places private keys exist.
//! - EVM keys are held in alloy's PrivateKeySigner
//! - Solana keys are held in an ed25519 SigningKey
//! - Keys are never serialized, never logged, and redacted from Debug output

use crate::approval::ApprovalSigner;
use crate::{Error, Result};
use alloy::primitives::{hex, Address};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};

/// secp256k1 keypair answering approvals as `evm-keypair:<address>`
pub struct EvmKeypairSigner {
    signer: PrivateKeySigner,
    address: Address,
}

impl EvmKeypairSigner {
    /// Create a signer from an environment variable holding a hex private key
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key_hex = std::env::var(var_name).map_err(|_| {
            Error::Config(format!(
                "Environment variable {} not set. Required for the admin signer.",
                var_name
            ))
        })?;

        Self::from_hex(&key_hex)
    }

    /// Create a signer from a hex-encoded private key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Signing(format!("Invalid private key: {}", e)))?;

        let address = signer.address();
        Ok(Self { signer, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-191 personal signature over raw bytes, 0x-prefixed hex
    pub fn sign_bytes(&self, bytes: &[u8]) -> Result<String> {
        let signature = self
            .signer
            .sign_message_sync(bytes)
            .map_err(|e| Error::Signing(format!("Signing failed: {}", e)))?;
        Ok(hex::encode_prefixed(signature.as_bytes()))
    }
}

/// Challenges arrive as 0x-prefixed hex and are signed as raw bytes;
/// anything else is signed as UTF-8 text.
fn challenge_bytes(message: &str) -> Vec<u8> {
    message
        .strip_prefix("0x")
        .and_then(|h| hex::decode(h).ok())
        .unwrap_or_else(|| message.as_bytes().to_vec())
}

#[async_trait]
impl ApprovalSigner for EvmKeypairSigner {
    fn locator(&self) -> String {
        format!("evm-keypair:{}", self.address)
    }

    async fn sign(&self, message: &str) -> Result<String> {
        self.sign_bytes(&challenge_bytes(message))
    }
}

impl std::fmt::Debug for EvmKeypairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmKeypairSigner")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

/// ed25519 keypair answering approvals as `solana-keypair:<base58 pubkey>`
pub struct SolanaKeypairSigner {
    key: SigningKey,
    public_key: String,
}

impl SolanaKeypairSigner {
    /// Accepts a base58 32-byte seed or a 64-byte keypair (seed followed by public key)
    pub fn from_base58(secret: &str) -> Result<Self> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| Error::Signing(format!("Invalid base58 secret key: {}", e)))?;

        let seed: [u8; 32] = match bytes.len() {
            32 | 64 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes[..32]);
                seed
            }
            n => {
                return Err(Error::Signing(format!(
                    "Solana secret key must be 32 or 64 bytes, got {}",
                    n
                )))
            }
        };

        Ok(Self::from_seed(&seed))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let key = SigningKey::from_bytes(seed);
        let public_key = bs58::encode(key.verifying_key().to_bytes()).into_string();
        Self { key, public_key }
    }

    /// Base58 public key (the wallet-facing address)
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// ed25519 signature over raw bytes, base58 encoded
    pub fn sign_bytes(&self, bytes: &[u8]) -> String {
        bs58::encode(self.key.sign(bytes).to_bytes()).into_string()
    }
}

#[async_trait]
impl ApprovalSigner for SolanaKeypairSigner {
    fn locator(&self) -> String {
        format!("solana-keypair:{}", self.public_key)
    }

    /// Solana challenges are base58 message bytes
    async fn sign(&self, message: &str) -> Result<String> {
        let bytes = bs58::decode(message)
            .into_vec()
            .map_err(|e| Error::Signing(format!("Approval message is not base58: {}", e)))?;
        Ok(self.sign_bytes(&bytes))
    }
}

impl std::fmt::Debug for SolanaKeypairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaKeypairSigner")
            .field("public_key", &self.public_key)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    // Well-known development key (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn evm_locator_uses_derived_address() {
        let signer = EvmKeypairSigner::from_hex(TEST_KEY).unwrap();
        assert_eq!(
            signer.locator().to_lowercase(),
            "evm-keypair:0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[tokio::test]
    async fn evm_signature_recovers_to_signer() {
        let signer = EvmKeypairSigner::from_hex(TEST_KEY).unwrap();
        let sig_hex = signer.sign("0xdeadbeef").await.unwrap();

        let bytes = hex::decode(&sig_hex).unwrap();
        assert_eq!(bytes.len(), 65);

        let signature = alloy::primitives::Signature::try_from(bytes.as_slice()).unwrap();
        let recovered = signature
            .recover_address_from_msg([0xde, 0xad, 0xbe, 0xef])
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn challenge_bytes_decodes_hex_only_when_prefixed() {
        assert_eq!(challenge_bytes("0x0102"), vec![1, 2]);
        assert_eq!(challenge_bytes("abc"), b"abc".to_vec());
        assert_eq!(challenge_bytes("0xzz"), b"0xzz".to_vec());
    }

    #[test]
    fn evm_debug_redacts_key() {
        let signer = EvmKeypairSigner::from_hex(TEST_KEY).unwrap();
        let debug_str = format!("{:?}", signer);
        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn solana_signature_verifies() {
        let signer = SolanaKeypairSigner::from_seed(&[7u8; 32]);
        let message = bs58::encode(b"approve me").into_string();

        let sig_b58 = signer.sign(&message).await.unwrap();
        let sig_bytes: [u8; 64] = bs58::decode(&sig_b58).into_vec().unwrap().try_into().unwrap();

        let verifying = SigningKey::from_bytes(&[7u8; 32]).verifying_key();
        assert!(verifying
            .verify(b"approve me", &Signature::from_bytes(&sig_bytes))
            .is_ok());
        assert!(signer.locator().starts_with("solana-keypair:"));
    }

    #[test]
    fn solana_accepts_64_byte_keypair() {
        let seed = [3u8; 32];
        let short = SolanaKeypairSigner::from_seed(&seed);

        let mut full = seed.to_vec();
        full.extend_from_slice(&bs58::decode(short.public_key()).into_vec().unwrap());
        let long = SolanaKeypairSigner::from_base58(&bs58::encode(full).into_string()).unwrap();

        assert_eq!(short.public_key(), long.public_key());
        assert!(SolanaKeypairSigner::from_base58("1111").is_err());
    }
}
