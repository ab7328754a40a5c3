//! Request signing for the Upload API.
//!
//! Signed parameters are sorted by name, serialized as `k=v` pairs joined
//! with `&`, suffixed with the API secret and hashed with SHA-1.

use sha1::{Digest, Sha1};

/// Parameters never included in the signature.
const UNSIGNED: &[&str] = &["file", "api_key", "resource_type", "cloud_name", "signature"];

/// Builds the string that gets hashed, without the secret.
pub fn string_to_sign(params: &[(&str, String)]) -> String {
    let mut signed: Vec<&(&str, String)> = params
        .iter()
        .filter(|(k, v)| !v.is_empty() && !UNSIGNED.contains(k))
        .collect();
    signed.sort_by(|a, b| a.0.cmp(b.0));

    signed
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Returns the hex-encoded SHA-1 signature for `params`.
pub fn sign_request(params: &[(&str, String)], api_secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
