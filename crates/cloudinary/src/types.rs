//! Request and response types for the Cloudinary API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Account credentials and delivery settings.
///
/// The advanced delivery fields (`private_cdn`, `cname`,
/// `secure_distribution`) are only honoured on paid plans.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Force `https` delivery URLs.
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub cdn_subdomain: bool,
    #[serde(default)]
    pub private_cdn: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_distribution: Option<String>,
}

impl ClientConfig {
    /// Creates a config with credentials only; every other field defaulted.
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            ..Default::default()
        }
    }
}

// The secret must never end up in logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("secure", &self.secure)
            .field("cdn_subdomain", &self.cdn_subdomain)
            .field("private_cdn", &self.private_cdn)
            .field("cname", &self.cname)
            .field("secure_distribution", &self.secure_distribution)
            .finish()
    }
}

/// One access-control rule (`access_type` plus optional time window).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlRule {
    pub access_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl AccessControlRule {
    /// The `{"access_type": "anonymous"}` rule.
    pub fn anonymous() -> Self {
        Self {
            access_type: "anonymous".into(),
            start: None,
            end: None,
        }
    }
}

/// Per-file upload options, serialized with the API's snake_case names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadParams {
    pub public_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub folder: String,
    pub resource_type: String,
    #[serde(rename = "type")]
    pub upload_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub access_control: Vec<AccessControlRule>,
    pub access_mode: String,
    pub use_filename: bool,
    pub unique_filename: bool,
    pub overwrite: bool,
    pub invalidate: bool,
    pub secure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_preset: Option<String>,
}

impl UploadParams {
    /// Returns the form fields sent to the upload endpoint.
    ///
    /// `resource_type` is part of the endpoint path and is not included.
    /// Empty values are dropped.
    pub fn to_form_fields(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        let mut fields = vec![
            ("public_id", self.public_id.clone()),
            ("folder", self.folder.clone()),
            ("type", self.upload_type.clone()),
            ("access_mode", self.access_mode.clone()),
            ("use_filename", self.use_filename.to_string()),
            ("unique_filename", self.unique_filename.to_string()),
            ("overwrite", self.overwrite.to_string()),
            ("invalidate", self.invalidate.to_string()),
            ("secure", self.secure.to_string()),
        ];
        if !self.access_control.is_empty() {
            fields.push((
                "access_control",
                serde_json::to_string(&self.access_control)?,
            ));
        }
        if let Some(preset) = &self.upload_preset {
            fields.push(("upload_preset", preset.clone()));
        }
        fields.retain(|(_, v)| !v.is_empty());
        Ok(fields)
    }
}

/// Response body of a successful upload.
///
/// Intermediate chunks of a large upload return a partial body, so every
/// field is defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub public_id: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default, rename = "type")]
    pub upload_type: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub secure_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

/// Error envelope returned by the API (internal).
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorMessage {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> UploadParams {
        UploadParams {
            public_id: "assets/app.js".into(),
            folder: String::new(),
            resource_type: "raw".into(),
            upload_type: "upload".into(),
            access_control: vec![AccessControlRule::anonymous()],
            access_mode: "public".into(),
            use_filename: true,
            unique_filename: true,
            overwrite: true,
            invalidate: true,
            secure: true,
            upload_preset: None,
        }
    }

    #[test]
    fn params_serialize_snake_case() {
        let json = serde_json::to_value(params()).unwrap();
        assert_eq!(json["public_id"], "assets/app.js");
        assert_eq!(json["type"], "upload");
        assert_eq!(json["use_filename"], true);
        assert_eq!(json["access_control"][0]["access_type"], "anonymous");
        assert!(json.get("folder").is_none());
        assert!(json.get("upload_preset").is_none());
    }

    #[test]
    fn form_fields_skip_empty_and_resource_type() {
        let fields = params().to_form_fields().unwrap();
        assert!(!fields.iter().any(|(k, _)| *k == "folder"));
        assert!(!fields.iter().any(|(k, _)| *k == "resource_type"));
        assert!(
            fields
                .iter()
                .any(|(k, v)| *k == "access_control" && v == r#"[{"access_type":"anonymous"}]"#)
        );
        assert!(fields.iter().any(|(k, v)| *k == "overwrite" && v == "true"));
        assert!(fields.iter().any(|(k, v)| *k == "secure" && v == "true"));
    }

    #[test]
    fn insecure_flag_is_sent_as_false() {
        let mut p = params();
        p.secure = false;
        let fields = p.to_form_fields().unwrap();
        assert!(fields.iter().any(|(k, v)| *k == "secure" && v == "false"));
    }

    #[test]
    fn form_fields_include_folder_and_preset() {
        let mut p = params();
        p.folder = "v1".into();
        p.upload_preset = Some("deploys".into());
        let fields = p.to_form_fields().unwrap();
        assert!(fields.iter().any(|(k, v)| *k == "folder" && v == "v1"));
        assert!(
            fields
                .iter()
                .any(|(k, v)| *k == "upload_preset" && v == "deploys")
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let config = ClientConfig::new("demo", "key", "s3cr3t");
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("s3cr3t"));
        assert!(dbg.contains("demo"));
    }

    #[test]
    fn partial_chunk_response_parses() {
        let resp: UploadResponse = serde_json::from_str(r#"{"done":false}"#).unwrap();
        assert_eq!(resp.done, Some(false));
        assert!(resp.public_id.is_empty());
    }
}
