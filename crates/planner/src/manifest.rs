//! Deployment manifest parsing and differential file selection.
//!
//! A manifest lists the files of a previous release. It is accepted either
//! as a JSON array of strings or as newline-delimited text.

use std::collections::HashSet;

/// Errors from manifest parsing.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("invalid JSON manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses a manifest body into its list of paths.
pub fn parse_manifest(body: &str) -> Result<Vec<String>, ManifestError> {
    let trimmed = body.trim_start_matches('\u{feff}').trim();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    Ok(trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Returns `paths` minus every entry in `manifest`, keeping `paths` order.
pub fn difference(paths: &[String], manifest: &[String]) -> Vec<String> {
    let deployed: HashSet<&str> = manifest.iter().map(String::as_str).collect();
    paths
        .iter()
        .filter(|p| !deployed.contains(p.as_str()))
        .cloned()
        .collect()
}
