//! Deploy pipeline hooks for publishing static assets to Cloudinary.
//!
//! The host pipeline owns a [`DeployContext`] for the duration of one
//! deploy and calls the [`DeployPlugin`] hooks in order:
//!
//! 1. **configure** — validate required credentials
//! 2. **will_build** — compute the fingerprint prefix and destination folder
//! 3. **upload** — filter the build output and run the upload planner

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod plugin;
pub mod scanner;

pub use config::{PluginConfig, Secret, TimestampSubfolder};
pub use context::{BuildConfig, DeployConfig, DeployContext, DeployState, FingerprintConfig};
pub use error::PluginError;
pub use filter::FileFilter;
pub use fingerprint::FINGERPRINT_ENV;
pub use plugin::{DeployPlugin, UploadHookResult};
pub use scanner::scan_dist_dir;
