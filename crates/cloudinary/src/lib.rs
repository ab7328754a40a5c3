//! Cloudinary API client for asset upload and public file delivery.
//!
//! Provides an async client for the [Cloudinary](https://cloudinary.com)
//! Upload API (signed requests, standard and chunked "large" uploads) and
//! for reading raw files back from the public delivery endpoint.

pub mod chunked;
pub mod client;
pub mod signature;
pub mod types;

pub use client::{Client, Error};
pub use types::{AccessControlRule, ClientConfig, UploadParams, UploadResponse};

/// Default chunk size for large uploads: 20 MB.
///
/// Matches the chunk size the provider's own SDKs use for `upload_large`.
pub const LARGE_UPLOAD_CHUNK_SIZE: usize = 20_000_000;
