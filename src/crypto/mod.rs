//! Relayer identity and signing.
//!
//! The relayer is one secp256k1 key pair shared across all configured chains.
//! The private key is loaded from an environment variable at runtime; the
//! config file only names the variable, never the key itself.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: The relayer key authorizes command submission on every
//! destination gateway. Private keys must never be exposed or logged.

use anyhow::{Context, Result};
use k256::ecdsa::{SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use tracing::info;

/// The relayer's signing identity: one address/key pair used everywhere.
pub struct RelayerIdentity {
    signing_key: SigningKey,
    address: String,
}

impl RelayerIdentity {
    /// Loads the identity from a hex-encoded secp256k1 private key held in
    /// the named environment variable.
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key_hex = std::env::var(var_name).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with your relayer private key (hex encoded).",
                var_name
            )
        })?;
        let identity = Self::from_hex(&key_hex)?;
        info!("Relayer identity loaded: address={}", identity.address);
        Ok(identity)
    }

    /// Builds the identity from a hex-encoded private key (with or without
    /// a 0x prefix).
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let clean = key_hex.trim().strip_prefix("0x").unwrap_or(key_hex.trim());
        let key_bytes = hex::decode(clean).context("Invalid private key hex")?;

        if key_bytes.len() != 32 {
            return Err(anyhow::anyhow!(
                "Invalid private key length: expected 32 bytes, got {}",
                key_bytes.len()
            ));
        }

        let key_array: [u8; 32] = key_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Failed to convert private key to array"))?;
        let signing_key = SigningKey::from_bytes(&key_array.into())
            .map_err(|e| anyhow::anyhow!("Failed to create ECDSA signing key: {}", e))?;
        let address = derive_address(signing_key.verifying_key());

        Ok(Self {
            signing_key,
            address,
        })
    }

    /// The relayer's address (0x-prefixed, lowercase hex).
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Signs a 32-byte transaction hash, returning `(r, s, recovery_id)`.
    pub fn sign_transaction_hash(&self, hash: &[u8; 32]) -> Result<([u8; 32], [u8; 32], u8)> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| anyhow::anyhow!("Failed to sign transaction hash: {}", e))?;

        let sig_bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..64]);

        Ok((r, s, recovery_id.to_byte()))
    }
}

/// Derives the Ethereum-style address from a secp256k1 public key:
/// keccak256(uncompressed_pubkey)[12..32].
fn derive_address(verifying_key: &VerifyingKey) -> String {
    let point = verifying_key.to_encoded_point(false);
    let bytes = point.as_bytes();

    // Uncompressed format: 0x04 || x (32 bytes) || y (32 bytes)
    let mut hasher = Keccak256::new();
    hasher.update(&bytes[1..]);
    let hash = hasher.finalize();

    format!("0x{}", hex::encode(&hash[12..32]))
}
