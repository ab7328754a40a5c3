//! Upload planner: resolves the file set and runs one upload pass.

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::error::PlannerError;
use crate::manifest::{difference, parse_manifest};
use crate::store::AssetStore;
use crate::types::{UploadOutcome, UploadPlan, UploadReport};

/// Runs a single upload pass for a plan.
///
/// A planner is built per deploy and consumed by [`Planner::upload`].
pub struct Planner<S> {
    store: S,
    plan: UploadPlan,
}

impl<S: AssetStore> Planner<S> {
    pub fn new(store: S, plan: UploadPlan) -> Self {
        Self { store, plan }
    }

    /// Returns the plan's files minus those listed in the remote manifest.
    ///
    /// Any manifest failure (unreachable, missing, unparsable) degrades to a
    /// full upload of every planned file.
    pub async fn resolve_files_to_upload(&self) -> Vec<String> {
        let all = &self.plan.file_paths;
        let Some(key) = self.plan.manifest_key() else {
            return all.clone();
        };

        info!(%key, "downloading manifest for differential deploy");

        let body = match self.store.fetch_file(&key).await {
            Ok(body) => body,
            Err(e) => {
                warn!(%key, error = %e, "manifest not found, disabling differential deploy");
                return all.clone();
            }
        };

        match parse_manifest(&body) {
            Ok(manifest) => {
                let remaining = difference(all, &manifest);
                info!(
                    manifest_entries = manifest.len(),
                    skipped = all.len() - remaining.len(),
                    "manifest found, differential deploy will be applied"
                );
                remaining
            }
            Err(e) => {
                warn!(%key, error = %e, "manifest unreadable, disabling differential deploy");
                all.clone()
            }
        }
    }

    /// Uploads every path and waits for all of them to settle.
    ///
    /// Outcomes come back in `paths` order. A source file that cannot be
    /// read fails the whole pass, but only after every other upload has
    /// finished.
    pub async fn upload_all(&self, paths: &[String]) -> Result<Vec<UploadOutcome>, PlannerError> {
        let uploads = paths.iter().map(|path| self.upload_one(path));

        let results: Vec<Result<UploadOutcome, PlannerError>> = match self.plan.concurrency {
            Some(limit) if limit > 0 => stream::iter(uploads).buffered(limit).collect().await,
            _ => join_all(uploads).await,
        };

        results.into_iter().collect()
    }

    /// Resolves, uploads, then uploads the manifest itself if configured.
    pub async fn upload(self) -> Result<UploadReport, PlannerError> {
        let paths = self.resolve_files_to_upload().await;
        info!(files = paths.len(), "uploading files");

        let mut outcomes = self.upload_all(&paths).await?;

        if let Some(manifest_path) = &self.plan.manifest_path {
            outcomes.push(self.upload_one(manifest_path).await?);
        }

        Ok(UploadReport::new(outcomes))
    }

    async fn upload_one(&self, path: &str) -> Result<UploadOutcome, PlannerError> {
        let source = self.plan.dist_dir.join(path);
        let params = self.plan.params_for(path);
        debug!(
            path,
            params = %serde_json::to_string(&params).unwrap_or_default(),
            "upload options"
        );

        match self
            .store
            .upload(&source, &params, self.plan.options.upload_large)
            .await
        {
            Ok(asset) => {
                let url = if self.plan.options.secure {
                    asset.secure_url
                } else {
                    asset.url
                };
                info!(path, public_id = %asset.public_id, %url, "uploaded");
                Ok(UploadOutcome::Uploaded {
                    path: path.to_string(),
                    public_id: asset.public_id,
                    url,
                })
            }
            Err(e) if e.is_fatal() => {
                error!(path, source = %source.display(), error = %e, "cannot read source file");
                Err(PlannerError::Source {
                    path: path.to_string(),
                    source: e,
                })
            }
            Err(e) => {
                warn!(path, error = %e, "upload failed");
                Ok(UploadOutcome::Failed {
                    path: path.to_string(),
                    error: e.to_string(),
                })
            }
        }
    }
}
