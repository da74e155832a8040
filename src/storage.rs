use anyhow::{Context, Result};
use axum::http::StatusCode;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Deserialize;

use crate::error::AppError;

/// Bucket holding client tax documents uploaded with service requests.
pub const DOCUMENTS_BUCKET: &str = "tax-documents";
/// Bucket holding uploaded signature photos from consent forms.
pub const SIGNATURES_BUCKET: &str = "signatures";

/// Characters escaped when an object key is embedded in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

// ── Object store client ───────────────────────────────────────────────────────

/// HTTP client for a Supabase-compatible storage API
/// (`{base}/object/...`, `{base}/object/sign/...`).
#[derive(Clone)]
pub struct Storage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl Storage {
    /// `base_url` is the storage endpoint including its API prefix,
    /// e.g. `https://xyz.supabase.co/storage/v1`.
    pub fn new(base_url: &str, service_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    /// Ask the store for a time-limited signed URL for `key`.
    pub async fn create_signed_url(
        &self,
        bucket: &str,
        key: &str,
        ttl_secs: u64,
    ) -> Result<String> {
        let url = format!(
            "{}/object/sign/{}/{}",
            self.base_url,
            bucket,
            utf8_percent_encode(key, PATH_SEGMENT)
        );

        let resp: SignResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .json(&serde_json::json!({ "expiresIn": ttl_secs }))
            .send()
            .await
            .context("Signed-URL request failed")?
            .error_for_status()
            .context("Signed-URL request rejected")?
            .json()
            .await
            .context("Invalid signed-URL response")?;

        // The store returns the signed path relative to its base.
        if resp.signed_url.starts_with('/') {
            Ok(format!("{}{}", self.base_url, resp.signed_url))
        } else {
            Ok(format!("{}/{}", self.base_url, resp.signed_url))
        }
    }

    /// Fetch an object for proxy streaming. Maps a missing object to
    /// `NotFound` and anything else to `UpstreamUnavailable` — internal
    /// store errors never reach response bodies.
    pub async fn download(&self, bucket: &str, key: &str) -> Result<reqwest::Response, AppError> {
        let url = format!(
            "{}/object/{}/{}",
            self.base_url,
            bucket,
            utf8_percent_encode(key, PATH_SEGMENT)
        );

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Object store unreachable: {}", e);
                AppError::UpstreamUnavailable
            })?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else if status == StatusCode::NOT_FOUND {
            Err(AppError::NotFound)
        } else {
            tracing::error!("Object store returned {} for {}/{}", status, bucket, key);
            Err(AppError::UpstreamUnavailable)
        }
    }

    /// Store an object under `key`.
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let url = format!(
            "{}/object/{}/{}",
            self.base_url,
            bucket,
            utf8_percent_encode(key, PATH_SEGMENT)
        );

        self.client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .context("Upload request failed")?
            .error_for_status()
            .context("Upload rejected by object store")?;

        Ok(())
    }
}

// ── Signed-resource broker ────────────────────────────────────────────────────

/// Derive the bare storage key from a stored reference. Older rows hold the
/// full public URL; the key is its final path segment.
pub fn object_key(path_or_url: &str) -> &str {
    if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
        path_or_url.rsplit('/').next().unwrap_or(path_or_url)
    } else {
        path_or_url
    }
}

/// Proxy-download route for `key`, served by the documents handler.
pub fn fallback_url(key: &str) -> String {
    format!("/api/documents/{}", utf8_percent_encode(key, PATH_SEGMENT))
}

/// Resolve a stored file reference to a usable URL: a time-limited signed
/// URL when the store cooperates, otherwise the deterministic proxy
/// fallback. Never fails — the containing page must still render.
pub async fn resolve_access_url(
    storage: Option<&Storage>,
    bucket: &str,
    path_or_url: &str,
    ttl_secs: u64,
) -> String {
    let key = object_key(path_or_url);

    if let Some(store) = storage {
        match store.create_signed_url(bucket, key, ttl_secs).await {
            Ok(url) => return url,
            Err(e) => {
                tracing::warn!("Signed URL generation failed for {}: {:#}", key, e);
            }
        }
    }

    fallback_url(key)
}

/// Content type for a stored filename, by extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}
