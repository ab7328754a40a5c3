//! Remote asset store trait.
//!
//! `AssetStore` is implemented for the Cloudinary client. Keeping the
//! planner behind a trait keeps it decoupled from HTTP and testable with mocks.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use assetdeploy_cloudinary::{Client, UploadParams};

/// Errors reported by an [`AssetStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The local source file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote side rejected or failed the request.
    #[error("{0}")]
    Remote(String),
}

impl StoreError {
    /// Whether this error should abort the whole upload pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}

impl From<assetdeploy_cloudinary::Error> for StoreError {
    fn from(err: assetdeploy_cloudinary::Error) -> Self {
        match err {
            assetdeploy_cloudinary::Error::Io(e) => StoreError::Io(e),
            other => StoreError::Remote(other.to_string()),
        }
    }
}

/// An asset stored remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredAsset {
    pub public_id: String,
    pub url: String,
    pub secure_url: String,
}

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Abstract remote store for deployed assets.
pub trait AssetStore: Send + Sync {
    /// Downloads a previously stored file as text.
    fn fetch_file<'a>(&'a self, key: &'a str) -> StoreFuture<'a, String>;

    /// Uploads `source`; `large` selects the chunked variant.
    fn upload<'a>(
        &'a self,
        source: &'a Path,
        params: &'a UploadParams,
        large: bool,
    ) -> StoreFuture<'a, StoredAsset>;
}

impl<T: AssetStore + ?Sized> AssetStore for &T {
    fn fetch_file<'a>(&'a self, key: &'a str) -> StoreFuture<'a, String> {
        (**self).fetch_file(key)
    }

    fn upload<'a>(
        &'a self,
        source: &'a Path,
        params: &'a UploadParams,
        large: bool,
    ) -> StoreFuture<'a, StoredAsset> {
        (**self).upload(source, params, large)
    }
}

impl AssetStore for Client {
    fn fetch_file<'a>(&'a self, key: &'a str) -> StoreFuture<'a, String> {
        Box::pin(async move { Ok::<_, StoreError>(Client::fetch_file(self, key).await?) })
    }

    fn upload<'a>(
        &'a self,
        source: &'a Path,
        params: &'a UploadParams,
        large: bool,
    ) -> StoreFuture<'a, StoredAsset> {
        Box::pin(async move {
            let resp = self.upload_asset(source, params, large).await?;
            Ok::<_, StoreError>(StoredAsset {
                public_id: resp.public_id,
                url: resp.url,
                secure_url: resp.secure_url,
            })
        })
    }
}
