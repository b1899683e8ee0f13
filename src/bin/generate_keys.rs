//! Relayer Key Generation Utility
//!
//! Generates a new secp256k1 key pair for the relayer.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin generate_keys
//! ```
//!
//! ## Output
//!
//! - Private key (hex encoded) - export as RELAYER_PRIVATE_KEY
//! - Relayer address - to be whitelisted on each destination gateway

use gateway_relayer::crypto::RelayerIdentity;
use rand::Rng;

fn main() {
    let mut rng = rand::rngs::OsRng;
    let mut secret_key_bytes = [0u8; 32];
    rng.fill(&mut secret_key_bytes);

    let private_key_hex = hex::encode(secret_key_bytes);
    let identity = RelayerIdentity::from_hex(&private_key_hex)
        .expect("freshly generated key must be valid");

    println!("Generated relayer key pair:");
    println!("Private Key (hex): {}", private_key_hex);
    println!("Relayer Address:   {}", identity.address());
    println!();
    println!("Export the private key as RELAYER_PRIVATE_KEY and whitelist the");
    println!("address on every destination gateway.");
}
