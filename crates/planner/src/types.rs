//! Data types for the upload pass.

use std::path::PathBuf;

use assetdeploy_cloudinary::{AccessControlRule, UploadParams};
use serde::{Deserialize, Serialize};

/// Per-file options shared by every upload of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOptions {
    pub use_filename: bool,
    pub unique_filename: bool,
    pub overwrite: bool,
    pub resource_type: String,
    pub upload_type: String,
    pub access_control: Vec<AccessControlRule>,
    pub access_mode: String,
    /// Report `https` URLs.
    pub secure: bool,
    pub invalidate: bool,
    /// Use the chunked upload variant (files over ~100 MB).
    pub upload_large: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_preset: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            use_filename: true,
            unique_filename: true,
            overwrite: true,
            resource_type: "raw".into(),
            upload_type: "upload".into(),
            access_control: vec![AccessControlRule::anonymous()],
            access_mode: "public".into(),
            secure: true,
            invalidate: true,
            upload_large: false,
            upload_preset: None,
        }
    }
}

/// Everything one upload pass needs.
///
/// `file_paths` are relative to `dist_dir` and have already been filtered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPlan {
    pub file_paths: Vec<String>,
    pub dist_dir: PathBuf,
    /// Destination folder prefix on the remote side.
    pub folder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
    pub options: UploadOptions,
    /// Maximum uploads in flight (None = all at once).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

impl UploadPlan {
    /// Remote key of the manifest, relative to the folder.
    pub fn manifest_key(&self) -> Option<String> {
        let manifest_path = self.manifest_path.as_deref()?;
        if self.folder.is_empty() {
            Some(manifest_path.to_string())
        } else {
            Some(format!("{}/{}", self.folder, manifest_path))
        }
    }

    /// Upload parameters for one file; the public id mirrors its path.
    pub fn params_for(&self, path: &str) -> UploadParams {
        let o = &self.options;
        UploadParams {
            public_id: path.to_string(),
            folder: self.folder.clone(),
            resource_type: o.resource_type.clone(),
            upload_type: o.upload_type.clone(),
            access_control: o.access_control.clone(),
            access_mode: o.access_mode.clone(),
            use_filename: o.use_filename,
            unique_filename: o.unique_filename,
            overwrite: o.overwrite,
            invalidate: o.invalidate,
            secure: o.secure,
            upload_preset: o.upload_preset.clone(),
        }
    }
}

/// Outcome of one attempted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Uploaded {
        path: String,
        public_id: String,
        url: String,
    },
    Failed {
        path: String,
        error: String,
    },
}

impl UploadOutcome {
    /// The relative path this outcome belongs to.
    pub fn path(&self) -> &str {
        match self {
            UploadOutcome::Uploaded { path, .. } | UploadOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded { .. })
    }
}

/// All outcomes of an upload pass, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadReport {
    outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn new(outcomes: Vec<UploadOutcome>) -> Self {
        Self { outcomes }
    }

    /// Number of attempted uploads (successes and failures).
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[UploadOutcome] {
        &self.outcomes
    }

    /// Paths that uploaded successfully.
    pub fn uploaded(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_uploaded())
            .map(UploadOutcome::path)
    }

    /// Failed outcomes.
    pub fn failed(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_uploaded())
    }

    pub fn into_outcomes(self) -> Vec<UploadOutcome> {
        self.outcomes
    }
}
