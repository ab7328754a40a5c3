//! Plugin configuration.
//!
//! Every option has a named field and a default, deserialized from the
//! host's configuration with camelCase keys:
//!
//! ```toml
//! cloudName = "demo"
//! apiKey = "123456789012345"
//! apiSecret = "..."
//! folder = "assets"
//! manifestPath = "manifest.txt"
//! timestampSubfolder = { enabled = true, type = "timestamp" }
//! ```

use std::fmt;
use std::path::PathBuf;

use assetdeploy_cloudinary::{AccessControlRule, ClientConfig};
use assetdeploy_planner::UploadOptions;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::PluginError;

/// Include pattern used when none is configured.
pub const DEFAULT_FILE_PATTERN: &str =
    "**/*.{js,css,png,gif,ico,jpg,map,xml,txt,svg,swf,eot,ttf,woff,woff2,otf,wasm}";

/// A credential that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(\"\")")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

/// Per-deploy subfolder settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimestampSubfolder {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `"timestamp"` (default) or `"md5"`. Only the literal `"md5"` selects
    /// the hashed variant; any other value, including `"hash"`, uses the
    /// plain timestamp.
    #[serde(rename = "type", default = "default_subfolder_type")]
    pub kind: String,
}

impl TimestampSubfolder {
    pub fn uses_md5(&self) -> bool {
        self.kind == "md5"
    }
}

impl Default for TimestampSubfolder {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: default_subfolder_type(),
        }
    }
}

/// Plugin configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: Secret,

    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    #[serde(default)]
    pub file_ignore_pattern: Option<String>,
    #[serde(default)]
    pub dot_folders: bool,

    /// Destination folder prefix.
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub timestamp_subfolder: TimestampSubfolder,

    #[serde(default = "default_true")]
    pub secure: bool,
    #[serde(default = "default_true")]
    pub invalidate: bool,
    /// Chunked upload for files over ~100 MB.
    #[serde(default)]
    pub upload_large: bool,
    #[serde(default = "default_true")]
    pub use_filename: bool,
    #[serde(default = "default_true")]
    pub unique_filename: bool,
    #[serde(default = "default_true")]
    pub overwrite: bool,
    #[serde(default = "default_resource_type")]
    pub resource_type: String,
    #[serde(rename = "type", default = "default_upload_type")]
    pub upload_type: String,
    /// A single rule or a list of rules.
    #[serde(
        default = "default_access_control",
        deserialize_with = "one_or_many"
    )]
    pub access_control: Vec<AccessControlRule>,
    #[serde(default = "default_access_mode")]
    pub access_mode: String,

    /// Overrides for values normally taken from the deploy context.
    #[serde(default)]
    pub manifest_path: Option<String>,
    #[serde(default)]
    pub dist_dir: Option<PathBuf>,
    #[serde(default)]
    pub dist_files: Option<Vec<String>>,

    /// Maximum uploads in flight; unset means no limit.
    #[serde(default)]
    pub concurrency: Option<usize>,

    // Advanced plan only.
    #[serde(default)]
    pub upload_preset: Option<String>,
    #[serde(default)]
    pub cdn_subdomain: bool,
    #[serde(default)]
    pub private_cdn: bool,
    #[serde(default)]
    pub cname: Option<String>,
    #[serde(default)]
    pub secure_distribution: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_subfolder_type() -> String {
    "timestamp".into()
}

fn default_file_pattern() -> String {
    DEFAULT_FILE_PATTERN.into()
}

fn default_resource_type() -> String {
    "raw".into()
}

fn default_upload_type() -> String {
    "upload".into()
}

fn default_access_control() -> Vec<AccessControlRule> {
    vec![AccessControlRule::anonymous()]
}

fn default_access_mode() -> String {
    "public".into()
}

fn one_or_many<'de, D>(de: D) -> Result<Vec<AccessControlRule>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(AccessControlRule),
        Many(Vec<AccessControlRule>),
    }

    Ok(match OneOrMany::deserialize(de)? {
        OneOrMany::One(rule) => vec![rule],
        OneOrMany::Many(rules) => rules,
    })
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: Secret::default(),
            file_pattern: default_file_pattern(),
            file_ignore_pattern: None,
            dot_folders: false,
            folder: String::new(),
            timestamp_subfolder: TimestampSubfolder::default(),
            secure: true,
            invalidate: true,
            upload_large: false,
            use_filename: true,
            unique_filename: true,
            overwrite: true,
            resource_type: default_resource_type(),
            upload_type: default_upload_type(),
            access_control: default_access_control(),
            access_mode: default_access_mode(),
            manifest_path: None,
            dist_dir: None,
            dist_files: None,
            concurrency: None,
            upload_preset: None,
            cdn_subdomain: false,
            private_cdn: false,
            cname: None,
            secure_distribution: None,
        }
    }
}

impl PluginConfig {
    /// Checks that every required option is present.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.cloud_name.is_empty() {
            return Err(PluginError::MissingConfig("cloudName"));
        }
        if self.api_key.is_empty() {
            return Err(PluginError::MissingConfig("apiKey"));
        }
        if self.api_secret.is_empty() {
            return Err(PluginError::MissingConfig("apiSecret"));
        }
        Ok(())
    }

    /// Client settings derived from this configuration.
    pub fn client_config(&self) -> ClientConfig {
        if self.secure {
            debug!("using secure flag (force https) from config");
        }
        if self.cdn_subdomain {
            debug!("using cdn subdomains flag from config");
        }
        if self.private_cdn {
            debug!("using private cdn flag from config");
        }
        if self.cname.is_some() {
            debug!("using cname from config");
        }
        if self.secure_distribution.is_some() {
            debug!("using secure distribution from config");
        }

        ClientConfig {
            cloud_name: self.cloud_name.clone(),
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.expose().to_string(),
            secure: self.secure,
            cdn_subdomain: self.cdn_subdomain,
            private_cdn: self.private_cdn,
            cname: self.cname.clone(),
            secure_distribution: self.secure_distribution.clone(),
        }
    }

    /// Per-file upload options derived from this configuration.
    pub fn upload_options(&self) -> UploadOptions {
        if self.upload_preset.is_some() {
            debug!("using upload preset from config");
        }
        UploadOptions {
            use_filename: self.use_filename,
            unique_filename: self.unique_filename,
            overwrite: self.overwrite,
            resource_type: self.resource_type.clone(),
            upload_type: self.upload_type.clone(),
            access_control: self.access_control.clone(),
            access_mode: self.access_mode.clone(),
            secure: self.secure,
            invalidate: self.invalidate,
            upload_large: self.upload_large,
            upload_preset: self.upload_preset.clone(),
        }
    }
}
