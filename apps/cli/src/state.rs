//! State file shared between `prepare` and `upload` runs.

use std::path::Path;

use anyhow::Context;
use assetdeploy_plugin::DeployState;

/// Reads the state file, returning `None` when it does not exist.
pub fn load(path: &Path) -> anyhow::Result<Option<DeployState>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let state = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse state file {}", path.display()))?;
    Ok(Some(state))
}

/// Writes the state file, creating parent directories as needed.
pub fn save(path: &Path, state: &DeployState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(state)?;
    std::fs::write(path, content)
        .with_context(|| format!("failed to write state file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "state saved");
    Ok(())
}
