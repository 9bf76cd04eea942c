//! Replay command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use shroud::{Ledger, Recording, SimCiphertext, SimulatedFhe};

use super::output::format_receipts;
use super::{OutputFormat, print_json};

/// Execute the replay command: re-run a recording and check every receipt.
///
/// # Errors
///
/// Returns an error if the recording cannot be loaded or replay diverges.
pub(crate) fn execute(recording: PathBuf, format: OutputFormat) -> Result<()> {
    let loaded = Recording::<SimCiphertext>::load(&recording)
        .with_context(|| format!("loading recording {}", recording.display()))?;
    let seed = loaded.seed;
    let entries = loaded.entries.len();

    let ledger = Ledger::replay(SimulatedFhe::from_seed(seed), loaded)?;

    match format {
        OutputFormat::Text => {
            println!("Replayed {entries} transactions (seed {seed}), all receipts match");
            print!("{}", format_receipts(ledger.receipts()));
        }
        OutputFormat::Json => print_json(&ledger.receipts())?,
    }
    Ok(())
}
