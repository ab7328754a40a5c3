//! Deploy plugin hooks.

use std::error::Error as _;

use assetdeploy_cloudinary::Client;
use assetdeploy_planner::{AssetStore, Planner, UploadOutcome, UploadPlan};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::context::DeployContext;
use crate::error::PluginError;
use crate::filter::FileFilter;
use crate::fingerprint::apply_fingerprint;

/// Result of the upload hook, merged into the context for later stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadHookResult {
    pub files_uploaded: Vec<UploadOutcome>,
}

/// Publishes build output to Cloudinary.
pub struct DeployPlugin {
    name: String,
}

impl Default for DeployPlugin {
    fn default() -> Self {
        Self::new("cloudinary")
    }
}

impl DeployPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Validates required configuration. Runs before any network activity.
    pub fn configure(&self, ctx: &DeployContext) -> Result<(), PluginError> {
        ctx.config.cloudinary.validate()?;
        debug!(plugin = %self.name, config = ?ctx.config.cloudinary, "configured");
        Ok(())
    }

    /// Pre-build hook: computes the fingerprint prefix and deploy subfolder.
    ///
    /// Returns the prefix, which is also stored on the context.
    pub fn will_build(&self, ctx: &mut DeployContext, now: DateTime<Utc>) -> String {
        let prefix = apply_fingerprint(ctx, now);
        info!(plugin = %self.name, %prefix, "fingerprint prefix ready");
        prefix
    }

    /// Filters the build output and assembles the upload plan.
    pub fn build_plan(&self, ctx: &DeployContext) -> Result<UploadPlan, PluginError> {
        let config = &ctx.config.cloudinary;
        let filter = FileFilter::new(
            &config.file_pattern,
            config.file_ignore_pattern.as_deref(),
            config.dot_folders,
        )?;

        let dist_files = ctx.resolved_dist_files();
        let file_paths = filter.apply(&dist_files);
        debug!(
            plugin = %self.name,
            total = dist_files.len(),
            selected = file_paths.len(),
            "filtered build output"
        );

        Ok(UploadPlan {
            file_paths,
            dist_dir: ctx.resolved_dist_dir(),
            folder: config.folder.clone(),
            manifest_path: ctx.resolved_manifest_path(),
            options: config.upload_options(),
            concurrency: config.concurrency,
        })
    }

    /// Upload hook using the Cloudinary client built from the configuration.
    pub async fn upload(&self, ctx: &mut DeployContext) -> Result<UploadHookResult, PluginError> {
        let plan = self.checked_plan(ctx)?;
        let client = Client::new(ctx.config.cloudinary.client_config())?;
        self.run_plan(ctx, client, plan).await
    }

    /// Upload hook against an arbitrary store.
    pub async fn upload_with<S: AssetStore>(
        &self,
        ctx: &mut DeployContext,
        store: S,
    ) -> Result<UploadHookResult, PluginError> {
        let plan = self.checked_plan(ctx)?;
        self.run_plan(ctx, store, plan).await
    }

    fn checked_plan(&self, ctx: &DeployContext) -> Result<UploadPlan, PluginError> {
        ctx.config.cloudinary.validate()?;
        self.build_plan(ctx)
    }

    async fn run_plan<S: AssetStore>(
        &self,
        ctx: &mut DeployContext,
        store: S,
        plan: UploadPlan,
    ) -> Result<UploadHookResult, PluginError> {
        info!(
            plugin = %self.name,
            cloud = %ctx.config.cloudinary.cloud_name,
            "preparing to upload to Cloudinary"
        );

        let report = match Planner::new(store, plan).upload().await {
            Ok(report) => report,
            Err(e) => {
                log_error_chain(&e);
                return Err(e.into());
            }
        };

        let failed = report.failed().count();
        if failed > 0 {
            warn!(plugin = %self.name, failed, "some files failed to upload");
        }
        info!(plugin = %self.name, "uploaded {} files ok", report.len() - failed);

        let files_uploaded = report.into_outcomes();
        ctx.files_uploaded = files_uploaded.clone();
        Ok(UploadHookResult { files_uploaded })
    }
}

fn log_error_chain(err: &assetdeploy_planner::PlannerError) {
    error!(error = %err, "upload failed");
    let mut source = err.source();
    while let Some(cause) = source {
        error!(cause = %cause, "caused by");
        source = cause.source();
    }
}
