//! Plugin error types.

/// Errors produced by the deploy hooks.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("missing required config: {0}")]
    MissingConfig(&'static str),

    #[error("invalid file pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cloudinary client error: {0}")]
    Client(#[from] assetdeploy_cloudinary::Error),

    #[error("upload failed: {0}")]
    Upload(#[from] assetdeploy_planner::PlannerError),
}
