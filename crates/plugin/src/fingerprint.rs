//! Fingerprint prefix and per-deploy subfolder.

use chrono::{DateTime, SecondsFormat, Utc};
use md5::{Digest, Md5};
use tracing::info;

use crate::context::DeployContext;

/// Name under which the prefix is exported to later pipeline stages.
pub const FINGERPRINT_ENV: &str = "CDN_FINGERPRINT_PREPEND";

/// Formats an instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Hex-encoded MD5 digest of `input`.
pub fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Computes the fingerprint prefix and stores it on the context.
///
/// With a configured `prepend` and the timestamp subfolder enabled, a
/// subfolder (timestamp, or its MD5 when the type is `"md5"`) is generated,
/// appended to the prefix and made the destination folder. A non-empty
/// folder is replaced by `"/" + subfolder`; its old value is not kept.
pub fn apply_fingerprint(ctx: &mut DeployContext, now: DateTime<Utc>) -> String {
    let prepend = ctx.config.build.fingerprint.prepend.clone();
    let cloudinary = &mut ctx.config.cloudinary;

    let prefix = match prepend {
        Some(prepend) if cloudinary.timestamp_subfolder.enabled => {
            let timestamp = iso_timestamp(now);
            let subfolder = if cloudinary.timestamp_subfolder.uses_md5() {
                md5_hex(&timestamp)
            } else {
                timestamp
            };

            cloudinary.folder = if cloudinary.folder.is_empty() {
                subfolder.clone()
            } else {
                format!("/{subfolder}")
            };
            info!(%subfolder, folder = %cloudinary.folder, "using deploy subfolder");

            let prefix = format!("{prepend}{subfolder}/");
            ctx.timestamp_subfolder = Some(subfolder);
            prefix
        }
        Some(prepend) => prepend,
        None => String::new(),
    };

    ctx.cdn_fingerprint_prepend = Some(prefix.clone());
    prefix
}
