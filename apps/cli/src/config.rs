//! Deploy configuration file.
//!
//! ```toml
//! distDir = "dist"
//! manifestPath = "manifest.txt"
//!
//! [build.fingerprint]
//! prepend = "https://res.cloudinary.com/demo/raw/upload/"
//!
//! [cloudinary]
//! cloudName = "demo"
//! folder = "assets"
//! ```
//!
//! Credentials are usually left out of the file and supplied through
//! `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY` and `CLOUDINARY_API_SECRET`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use assetdeploy_plugin::{BuildConfig, DeployConfig, DeployContext, PluginConfig, Secret};
use serde::Deserialize;

use crate::cli::Credentials;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    /// Build output directory.
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,

    /// Explicit file list; the directory is scanned when absent.
    #[serde(default)]
    pub dist_files: Option<Vec<String>>,

    #[serde(default)]
    pub manifest_path: Option<String>,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub cloudinary: PluginConfig,
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            dist_dir: default_dist_dir(),
            dist_files: None,
            manifest_path: None,
            build: BuildConfig::default(),
            cloudinary: PluginConfig::default(),
        }
    }
}

impl FileConfig {
    /// Loads the file at `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Builds the deploy context, applying credential and directory overrides.
    pub fn into_context(self, credentials: &Credentials, dist_dir: Option<PathBuf>) -> DeployContext {
        let mut cloudinary = self.cloudinary;
        if let Some(name) = non_empty(&credentials.cloud_name) {
            cloudinary.cloud_name = name.to_string();
        }
        if let Some(key) = non_empty(&credentials.api_key) {
            cloudinary.api_key = key.to_string();
        }
        if let Some(secret) = non_empty(&credentials.api_secret) {
            cloudinary.api_secret = Secret::new(secret);
        }

        let config = DeployConfig {
            build: self.build,
            cloudinary,
        };
        let mut ctx = DeployContext::new(dist_dir.unwrap_or(self.dist_dir), config);
        ctx.dist_files = self.dist_files.unwrap_or_default();
        ctx.manifest_path = self.manifest_path;
        ctx
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
