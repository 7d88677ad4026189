//! Chain history replay from a JSON header file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};
use waves_rewards::{LedgerView, RewardLedger};
use waves_types::{BlockHeader, Height};

pub fn load_headers(path: &Path) -> Result<Vec<BlockHeader>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read chain file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse chain file {}", path.display()))
}

/// Apply `headers` in order and return the resulting height.
pub fn import_headers(ledger: &mut RewardLedger, headers: &[BlockHeader]) -> Result<Height> {
    for header in headers {
        let record = ledger
            .apply_block(header)
            .with_context(|| format!("failed to apply block at height {}", header.height))?;
        debug!(
            target: "node",
            height = record.height,
            emission = record.emission,
            "imported block"
        );
    }

    let height = ledger.height();
    info!(target: "node", blocks = headers.len(), height, "chain import complete");
    Ok(height)
}
