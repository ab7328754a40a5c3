//! Deploy context shared by all hooks of one deploy run.

use std::path::PathBuf;

use assetdeploy_planner::UploadOutcome;
use serde::{Deserialize, Serialize};

use crate::config::PluginConfig;

/// Build fingerprinting settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FingerprintConfig {
    /// URL or path prefix prepended to fingerprinted asset references.
    #[serde(default)]
    pub prepend: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
}

/// Configuration visible to the hooks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub cloudinary: PluginConfig,
}

/// Mutable state bag for one deploy run.
///
/// Created by the host before the first hook and dropped after the last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployContext {
    /// Build output directory.
    pub dist_dir: PathBuf,
    /// Build output files, relative to `dist_dir`.
    pub dist_files: Vec<String>,
    /// Manifest written by an earlier pipeline stage, if any.
    pub manifest_path: Option<String>,
    pub config: DeployConfig,
    /// Subfolder generated by `will_build`.
    pub timestamp_subfolder: Option<String>,
    /// Prefix generated by `will_build` for downstream stages.
    pub cdn_fingerprint_prepend: Option<String>,
    /// Outcomes of the upload hook.
    pub files_uploaded: Vec<UploadOutcome>,
}

/// The part of a context that later stages need when they run in a
/// separate process. Credentials are never included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployState {
    pub folder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_subfolder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn_fingerprint_prepend: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_uploaded: Vec<UploadOutcome>,
}

impl DeployContext {
    pub fn new(dist_dir: impl Into<PathBuf>, config: DeployConfig) -> Self {
        Self {
            dist_dir: dist_dir.into(),
            config,
            ..Default::default()
        }
    }

    /// Output directory, honouring the `distDir` override.
    pub fn resolved_dist_dir(&self) -> PathBuf {
        self.config
            .cloudinary
            .dist_dir
            .clone()
            .unwrap_or_else(|| self.dist_dir.clone())
    }

    /// Output files, honouring the `distFiles` override.
    pub fn resolved_dist_files(&self) -> Vec<String> {
        self.config
            .cloudinary
            .dist_files
            .clone()
            .unwrap_or_else(|| self.dist_files.clone())
    }

    /// Manifest path, honouring the `manifestPath` override.
    pub fn resolved_manifest_path(&self) -> Option<String> {
        self.config
            .cloudinary
            .manifest_path
            .clone()
            .or_else(|| self.manifest_path.clone())
    }

    /// Snapshot of the fields produced by the hooks.
    pub fn state(&self) -> DeployState {
        DeployState {
            folder: self.config.cloudinary.folder.clone(),
            timestamp_subfolder: self.timestamp_subfolder.clone(),
            cdn_fingerprint_prepend: self.cdn_fingerprint_prepend.clone(),
            files_uploaded: self.files_uploaded.clone(),
        }
    }

    /// Restores fields produced by hooks that ran in an earlier process.
    pub fn apply_state(&mut self, state: DeployState) {
        self.config.cloudinary.folder = state.folder;
        self.timestamp_subfolder = state.timestamp_subfolder;
        self.cdn_fingerprint_prepend = state.cdn_fingerprint_prepend;
        self.files_uploaded = state.files_uploaded;
    }
}
