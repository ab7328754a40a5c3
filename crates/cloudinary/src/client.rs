//! Cloudinary API client.
//!
//! Async HTTP client using `reqwest`. Upload requests are signed with the
//! account's API secret; public files are fetched unauthenticated from the
//! delivery host.

use std::path::Path;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::header::CONTENT_RANGE;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::LARGE_UPLOAD_CHUNK_SIZE;
use crate::chunked::ChunkReader;
use crate::signature::sign_request;
use crate::types::{ApiErrorBody, ClientConfig, UploadParams, UploadResponse};

const DEFAULT_API_URL: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_DELIVERY_URL: &str = "https://res.cloudinary.com";
const SHARED_CDN_HOST: &str = "res.cloudinary.com";

const UPLOAD_ID_HEADER: &str = "X-Unique-Upload-Id";

/// Path percent-encode set; `/` stays a separator.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Errors from the Cloudinary client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}

/// Cloudinary API client.
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
    api_url: String,
    delivery_url: String,
    chunk_size: usize,
}

impl Client {
    /// Creates a new client. Cloud name, API key and secret are required.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        if config.cloud_name.is_empty() {
            return Err(Error::MissingConfig("cloud_name"));
        }
        if config.api_key.is_empty() {
            return Err(Error::MissingConfig("api_key"));
        }
        if config.api_secret.is_empty() {
            return Err(Error::MissingConfig("api_secret"));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("assetdeploy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            config,
            api_url: DEFAULT_API_URL.to_string(),
            delivery_url: DEFAULT_DELIVERY_URL.to_string(),
            chunk_size: LARGE_UPLOAD_CHUNK_SIZE,
        })
    }

    /// Points the client at custom API and delivery hosts (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_urls(mut self, api_url: String, delivery_url: String) -> Self {
        self.api_url = api_url;
        self.delivery_url = delivery_url;
        self
    }

    /// Overrides the large-upload chunk size (for testing).
    #[cfg(test)]
    pub(crate) fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL of a raw file on the public delivery host.
    ///
    /// `key` is joined verbatim, so a key with a leading `/` produces an
    /// empty path segment.
    pub fn file_url(&self, key: &str) -> String {
        let path = [self.config.cloud_name.as_str(), "files", key].join("/");
        format!("{}/{}", self.delivery_url, utf8_percent_encode(&path, PATH))
    }

    /// Downloads a public file as text.
    pub async fn fetch_file(&self, key: &str) -> Result<String, Error> {
        let url = self.file_url(key);
        debug!(%url, "fetching file");

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.text().await?)
    }

    /// Uploads a file in a single request.
    pub async fn upload(
        &self,
        source: &Path,
        params: &UploadParams,
    ) -> Result<UploadResponse, Error> {
        let data = tokio::fs::read(source).await?;
        let fields = self.signed_fields(params)?;
        let form = build_form(&fields, data, file_name(source));
        self.post_form(&self.upload_url(&params.resource_type), form, None)
            .await
    }

    /// Uploads a file in fixed-size chunks sharing one upload id.
    ///
    /// Each chunk carries a `Content-Range` header; the response to the
    /// last chunk describes the finished asset. Empty files fall back to
    /// [`Client::upload`].
    pub async fn upload_large(
        &self,
        source: &Path,
        params: &UploadParams,
    ) -> Result<UploadResponse, Error> {
        let mut reader = ChunkReader::open(source, self.chunk_size).await?;
        let total = reader.file_size();
        if total == 0 {
            return self.upload(source, params).await;
        }

        let upload_id = uuid::Uuid::new_v4().simple().to_string();
        let fields = self.signed_fields(params)?;
        let url = self.upload_url(&params.resource_type);
        let name = file_name(source);

        let mut last = None;
        while let Some(chunk) = reader.next_chunk().await? {
            let range = chunk.content_range(total);
            debug!(public_id = %params.public_id, %range, "uploading chunk");

            let form = build_form(&fields, chunk.data, name.clone());
            let resp = self
                .post_form(&url, form, Some((&upload_id, &range)))
                .await?;
            last = Some(resp);
        }

        if reader.offset() != total {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "file shrank during upload",
            )));
        }
        last.ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no data read",
            ))
        })
    }

    /// Uploads `source`, chunked when `large` is set, and fills in the
    /// public id and URLs when the API response leaves them out.
    pub async fn upload_asset(
        &self,
        source: &Path,
        params: &UploadParams,
        large: bool,
    ) -> Result<UploadResponse, Error> {
        let mut resp = if large {
            self.upload_large(source, params).await?
        } else {
            self.upload(source, params).await?
        };

        if resp.public_id.is_empty() {
            resp.public_id = params.public_id.clone();
        }
        if resp.url.is_empty() || resp.secure_url.is_empty() {
            let built = self.delivery_url(&params.resource_type, &params.upload_type, &resp.public_id);
            if resp.url.is_empty() {
                resp.url = built.clone();
            }
            if resp.secure_url.is_empty() {
                resp.secure_url = built;
            }
        }
        Ok(resp)
    }

    /// Builds the public delivery URL of an asset.
    ///
    /// Honours `secure`, `secure_distribution`, `private_cdn`, `cname` and
    /// `cdn_subdomain` the same way the provider's SDKs do.
    pub fn delivery_url(&self, resource_type: &str, upload_type: &str, public_id: &str) -> String {
        let c = &self.config;
        let subdomain = c
            .cdn_subdomain
            .then(|| crc32fast::hash(public_id.as_bytes()) % 5 + 1);

        let prefix = if c.secure {
            let host = match &c.secure_distribution {
                Some(dist) => dist.clone(),
                None if c.private_cdn => format!("{}-res.cloudinary.com", c.cloud_name),
                None => SHARED_CDN_HOST.to_string(),
            };
            format!("https://{host}")
        } else if let Some(cname) = &c.cname {
            match subdomain {
                Some(n) => format!("http://a{n}.{cname}"),
                None => format!("http://{cname}"),
            }
        } else {
            let base = if c.private_cdn {
                format!("{}-res", c.cloud_name)
            } else {
                "res".to_string()
            };
            match subdomain {
                Some(n) => format!("http://{base}-{n}.cloudinary.com"),
                None => format!("http://{base}.cloudinary.com"),
            }
        };

        let shared_domain =
            !c.private_cdn || (c.secure && prefix == format!("https://{SHARED_CDN_HOST}"));
        let mut url = prefix;
        if shared_domain {
            url.push('/');
            url.push_str(&c.cloud_name);
        }
        format!(
            "{url}/{resource_type}/{upload_type}/{}",
            utf8_percent_encode(public_id, PATH)
        )
    }

    fn upload_url(&self, resource_type: &str) -> String {
        format!(
            "{}/{}/{}/upload",
            self.api_url, self.config.cloud_name, resource_type
        )
    }

    /// Returns the upload fields plus `timestamp`, `api_key` and `signature`.
    fn signed_fields(&self, params: &UploadParams) -> Result<Vec<(&'static str, String)>, Error> {
        let mut fields = params.to_form_fields()?;
        fields.push(("timestamp", chrono::Utc::now().timestamp().to_string()));
        let signature = sign_request(&fields, &self.config.api_secret);
        fields.push(("api_key", self.config.api_key.clone()));
        fields.push(("signature", signature));
        Ok(fields)
    }

    async fn post_form(
        &self,
        url: &str,
        form: Form,
        chunk: Option<(&str, &str)>,
    ) -> Result<UploadResponse, Error> {
        let mut request = self.http.post(url).multipart(form);
        if let Some((upload_id, range)) = chunk {
            request = request
                .header(UPLOAD_ID_HEADER, upload_id)
                .header(CONTENT_RANGE, range);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

fn build_form(fields: &[(&'static str, String)], data: Vec<u8>, file_name: String) -> Form {
    let mut form = Form::new();
    for (key, value) in fields {
        form = form.text(*key, value.clone());
    }
    form.part("file", Part::bytes(data).file_name(file_name))
}

fn file_name(source: &Path) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".into())
}

/// Extracts `error.message` from an API error body, or the raw body.
fn api_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    /// A request as seen by the mock server.
    #[derive(Debug)]
    struct Captured {
        request_line: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Captured {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }

        fn body_text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    async fn read_request(stream: &mut TcpStream) -> Captured {
        let mut buf = Vec::new();
        let mut tmp = [0u8; 8192];

        let header_end = loop {
            let n = stream.read(&mut tmp).await.unwrap();
            buf.extend_from_slice(&tmp[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                break buf.len();
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        let chunked = headers
            .iter()
            .any(|(k, v)| k == "transfer-encoding" && v.contains("chunked"));

        let mut body = buf[header_end..].to_vec();
        loop {
            let complete = if chunked {
                body.ends_with(b"0\r\n\r\n")
            } else {
                body.len() >= content_length
            };
            if complete {
                break;
            }
            let n = stream.read(&mut tmp).await.unwrap();
            if n == 0 {
                break;
            }
            body.extend_from_slice(&tmp[..n]);
        }

        Captured {
            request_line,
            headers,
            body,
        }
    }

    /// Starts a mock HTTP server answering one connection per canned response.
    async fn mock_server(
        responses: Vec<(u16, &'static str)>,
    ) -> (
        String,
        mpsc::UnboundedReceiver<Captured>,
        tokio::task::JoinHandle<()>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let captured = read_request(&mut stream).await;
                let _ = tx.send(captured);

                let resp = format!(
                    "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, rx, handle)
    }

    fn test_client(url: &str) -> Client {
        Client::new(ClientConfig::new("demo", "123456", "secret"))
            .unwrap()
            .with_base_urls(url.to_string(), url.to_string())
    }

    fn params(public_id: &str) -> UploadParams {
        UploadParams {
            public_id: public_id.into(),
            folder: String::new(),
            resource_type: "raw".into(),
            upload_type: "upload".into(),
            access_control: vec![crate::AccessControlRule::anonymous()],
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
    fn new_requires_credentials() {
        let err = Client::new(ClientConfig::new("", "k", "s")).err().unwrap();
        assert!(matches!(err, Error::MissingConfig("cloud_name")));
        let err = Client::new(ClientConfig::new("c", "", "s")).err().unwrap();
        assert!(matches!(err, Error::MissingConfig("api_key")));
        let err = Client::new(ClientConfig::new("c", "k", "")).err().unwrap();
        assert!(matches!(err, Error::MissingConfig("api_secret")));
    }

    #[test]
    fn file_url_joins_key() {
        let client = Client::new(ClientConfig::new("demo", "k", "s")).unwrap();
        assert_eq!(
            client.file_url("v1/manifest.txt"),
            "https://res.cloudinary.com/demo/files/v1/manifest.txt"
        );
        assert_eq!(
            client.file_url("my folder/manifest.txt"),
            "https://res.cloudinary.com/demo/files/my%20folder/manifest.txt"
        );
    }

    #[test]
    fn delivery_url_shared_secure() {
        let mut config = ClientConfig::new("demo", "k", "s");
        config.secure = true;
        let client = Client::new(config).unwrap();
        assert_eq!(
            client.delivery_url("raw", "upload", "assets/app.js"),
            "https://res.cloudinary.com/demo/raw/upload/assets/app.js"
        );
    }

    #[test]
    fn delivery_url_private_cdn_secure() {
        let mut config = ClientConfig::new("demo", "k", "s");
        config.secure = true;
        config.private_cdn = true;
        let client = Client::new(config).unwrap();
        assert_eq!(
            client.delivery_url("raw", "upload", "app.js"),
            "https://demo-res.cloudinary.com/raw/upload/app.js"
        );
    }

    #[test]
    fn delivery_url_secure_distribution() {
        let mut config = ClientConfig::new("demo", "k", "s");
        config.secure = true;
        config.private_cdn = true;
        config.secure_distribution = Some("cdn.example.com".into());
        let client = Client::new(config).unwrap();
        assert_eq!(
            client.delivery_url("raw", "upload", "app.js"),
            "https://cdn.example.com/raw/upload/app.js"
        );
    }

    #[test]
    fn delivery_url_cname_insecure() {
        let mut config = ClientConfig::new("demo", "k", "s");
        config.cname = Some("assets.example.com".into());
        let client = Client::new(config).unwrap();
        assert_eq!(
            client.delivery_url("raw", "upload", "app.js"),
            "http://assets.example.com/demo/raw/upload/app.js"
        );
    }

    #[test]
    fn delivery_url_cdn_subdomain_is_stable() {
        let mut config = ClientConfig::new("demo", "k", "s");
        config.cdn_subdomain = true;
        let client = Client::new(config).unwrap();
        let first = client.delivery_url("raw", "upload", "app.js");
        let second = client.delivery_url("raw", "upload", "app.js");
        assert_eq!(first, second);
        assert!(first.starts_with("http://res-"), "{first}");
        assert!(first.contains(".cloudinary.com/demo/raw/upload/app.js"));
    }

    #[test]
    fn api_error_message_extracts_message() {
        let msg = api_error_message(br#"{"error":{"message":"Invalid Signature"}}"#);
        assert_eq!(msg, "Invalid Signature");
        assert_eq!(api_error_message(b"plain text"), "plain text");
    }

    #[tokio::test]
    async fn fetch_file_returns_body() {
        let (url, mut rx, handle) = mock_server(vec![(200, "app.js\napp.css\n")]).await;

        let client = test_client(&url);
        let body = client.fetch_file("manifest.txt").await.unwrap();
        assert_eq!(body, "app.js\napp.css\n");

        let req = rx.recv().await.unwrap();
        assert!(
            req.request_line.starts_with("GET /demo/files/manifest.txt "),
            "{}",
            req.request_line
        );

        handle.abort();
    }

    #[tokio::test]
    async fn fetch_file_not_found() {
        let (url, _rx, handle) = mock_server(vec![(404, "Resource not found")]).await;

        let client = test_client(&url);
        let err = client.fetch_file("manifest.txt").await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, .. }), "{err}");

        handle.abort();
    }

    #[tokio::test]
    async fn upload_sends_signed_multipart() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("app.js");
        std::fs::write(&source, b"console.log(1)").unwrap();

        let json = r#"{"public_id":"assets/app.js","version":1,"resource_type":"raw",
            "url":"http://res.cloudinary.com/demo/raw/upload/v1/assets/app.js",
            "secure_url":"https://res.cloudinary.com/demo/raw/upload/v1/assets/app.js"}"#;
        let (url, mut rx, handle) = mock_server(vec![(200, json)]).await;

        let client = test_client(&url);
        let resp = client
            .upload(&source, &params("assets/app.js"))
            .await
            .unwrap();
        assert_eq!(resp.public_id, "assets/app.js");
        assert!(resp.secure_url.starts_with("https://"));

        let req = rx.recv().await.unwrap();
        assert!(
            req.request_line.starts_with("POST /demo/raw/upload "),
            "{}",
            req.request_line
        );
        assert!(
            req.header("content-type")
                .unwrap()
                .starts_with("multipart/form-data")
        );
        let body = req.body_text();
        assert!(body.contains("name=\"public_id\""));
        assert!(body.contains("assets/app.js"));
        assert!(body.contains("name=\"signature\""));
        assert!(body.contains("name=\"api_key\""));
        assert!(body.contains("name=\"timestamp\""));
        assert!(body.contains("console.log(1)"));

        handle.abort();
    }

    #[tokio::test]
    async fn upload_api_error_surfaces_message() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("app.js");
        std::fs::write(&source, b"x").unwrap();

        let (url, _rx, handle) =
            mock_server(vec![(401, r#"{"error":{"message":"Invalid Signature"}}"#)]).await;

        let client = test_client(&url);
        let err = client.upload(&source, &params("app.js")).await.unwrap_err();
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid Signature");
            }
            other => panic!("unexpected error: {other}"),
        }

        handle.abort();
    }

    #[tokio::test]
    async fn upload_missing_source_is_io_error() {
        let client = Client::new(ClientConfig::new("demo", "k", "s")).unwrap();
        let err = client
            .upload(Path::new("/nonexistent/app.js"), &params("app.js"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn upload_asset_fills_missing_response_fields() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("app.js");
        std::fs::write(&source, b"x").unwrap();

        let (url, _rx, handle) = mock_server(vec![(200, "{}")]).await;

        let client = test_client(&url);
        let resp = client
            .upload_asset(&source, &params("assets/app.js"), false)
            .await
            .unwrap();
        let expected = client.delivery_url("raw", "upload", "assets/app.js");
        assert_eq!(resp.public_id, "assets/app.js");
        assert_eq!(expected, "http://res.cloudinary.com/demo/raw/upload/assets/app.js");
        assert_eq!(resp.url, expected);
        assert_eq!(resp.secure_url, expected);

        handle.abort();
    }

    #[tokio::test]
    async fn upload_asset_keeps_api_urls() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("app.js");
        std::fs::write(&source, b"x").unwrap();

        let json = r#"{"public_id":"v9/app.js","url":"http://cdn.test/app.js","secure_url":"https://cdn.test/app.js"}"#;
        let (url, _rx, handle) = mock_server(vec![(200, json)]).await;

        let client = test_client(&url);
        let resp = client
            .upload_asset(&source, &params("app.js"), false)
            .await
            .unwrap();
        assert_eq!(resp.public_id, "v9/app.js");
        assert_eq!(resp.url, "http://cdn.test/app.js");
        assert_eq!(resp.secure_url, "https://cdn.test/app.js");

        handle.abort();
    }

    #[tokio::test]
    async fn upload_large_empty_file_uses_single_request() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("empty.txt");
        std::fs::write(&source, b"").unwrap();

        let (url, mut rx, handle) =
            mock_server(vec![(200, r#"{"public_id":"empty.txt"}"#)]).await;

        let client = test_client(&url).with_chunk_size(4);
        let resp = client
            .upload_large(&source, &params("empty.txt"))
            .await
            .unwrap();
        assert_eq!(resp.public_id, "empty.txt");

        let req = rx.recv().await.unwrap();
        assert!(req.request_line.starts_with("POST /demo/raw/upload "));
        assert!(req.header("content-range").is_none());
        assert!(req.header("x-unique-upload-id").is_none());

        handle.await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn upload_large_sends_content_ranges() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("big.bin");
        std::fs::write(&source, b"0123456789").unwrap();

        let (url, mut rx, handle) = mock_server(vec![
            (200, r#"{"done":false}"#),
            (200, r#"{"done":false}"#),
            (200, r#"{"public_id":"big.bin","bytes":10,"done":true}"#),
        ])
        .await;

        let client = test_client(&url).with_chunk_size(4);
        let resp = client
            .upload_large(&source, &params("big.bin"))
            .await
            .unwrap();
        assert_eq!(resp.public_id, "big.bin");
        assert_eq!(resp.bytes, 10);

        let mut ranges = Vec::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let req = rx.recv().await.unwrap();
            ranges.push(req.header("content-range").unwrap().to_string());
            ids.push(req.header("x-unique-upload-id").unwrap().to_string());
        }
        assert_eq!(
            ranges,
            vec!["bytes 0-3/10", "bytes 4-7/10", "bytes 8-9/10"]
        );
        assert!(!ids[0].is_empty());
        assert!(ids.iter().all(|id| id == &ids[0]));

        handle.abort();
    }
}
