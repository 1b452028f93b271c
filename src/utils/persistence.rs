use std::{fs, path::Path};

use tracing::debug;

use crate::{errors::Result, ledger::BudgetRequest};

/// Writes the provided request to disk atomically by staging to a temporary file.
pub fn save_request_to_file(request: &BudgetRequest, path: &Path) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(request)?;
    fs::write(&tmp, json)?;
    fs::rename(tmp, path)?;
    debug!(path = %path.display(), rows = request.items.len(), "saved budget request");
    Ok(())
}

/// Loads a request snapshot from disk, returning structured errors on failure.
pub fn load_request_from_file(path: &Path) -> Result<BudgetRequest> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
