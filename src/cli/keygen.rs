//! Keygen command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use shroud::Wallet;

use super::{OutputFormat, print_json};

#[derive(Debug, Serialize)]
struct KeyInfo {
    address: String,
    viewer_public_key: String,
}

/// Execute the keygen command: print a wallet's address and viewer key.
///
/// With `seed` (64 hex characters) the wallet is derived deterministically.
///
/// # Errors
///
/// Returns an error if the seed is not 32 bytes of hex.
pub(crate) fn execute(seed: Option<String>, format: OutputFormat) -> Result<()> {
    let wallet = match seed {
        Some(text) => {
            let bytes = hex::decode(text.trim_start_matches("0x")).context("seed is not hex")?;
            let seed: [u8; 32] = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("seed must be exactly 32 bytes"))?;
            Wallet::from_seed(&seed)
        }
        None => Wallet::generate(),
    };

    let info = KeyInfo {
        address: wallet.address().to_string(),
        viewer_public_key: format!("0x{}", hex::encode(wallet.viewer().public_key().as_bytes())),
    };

    match format {
        OutputFormat::Text => {
            println!("Address:           {}", info.address);
            println!("Viewer public key: {}", info.viewer_public_key);
        }
        OutputFormat::Json => print_json(&info)?,
    }
    Ok(())
}
