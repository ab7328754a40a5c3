//! Planner error types.

use crate::store::StoreError;

/// Errors that abort an upload pass.
///
/// Remote failures are not errors at this level: they are reported per
/// file as [`crate::UploadOutcome::Failed`].
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("cannot read source file {path}: {source}")]
    Source {
        path: String,
        #[source]
        source: StoreError,
    },
}
