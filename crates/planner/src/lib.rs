//! Asset upload planner and executor.
//!
//! This crate decides **which** files of a build get uploaded and runs the
//! uploads. It has no transport of its own: the caller supplies an
//! [`AssetStore`] (the Cloudinary client in production, a mock in tests).
//!
//! # Pipeline
//!
//! 1. **Resolve** — diff the plan's file list against the previous
//!    deployment manifest, if one is configured and reachable
//! 2. **Upload** — one upload per file, concurrently, every outcome kept
//! 3. **Manifest** — upload the manifest itself for the next deploy

pub mod error;
pub mod manifest;
pub mod planner;
pub mod store;
pub mod types;

pub use error::PlannerError;
pub use manifest::{difference, parse_manifest};
pub use planner::Planner;
pub use store::{AssetStore, StoreError, StoredAsset};
pub use types::{UploadOptions, UploadOutcome, UploadPlan, UploadReport};
