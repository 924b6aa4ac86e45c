#![doc = "Remote store integration for the CLI: implements the core `RemoteStore` trait against the Google Cloud Storage JSON API."]
//
//! # GCS client (CLI <-> Core)
//!
//! [`GcsClient`] uploads single files with `uploadType=media` requests. The
//! destination is given as a bucket URL (`gs://bucket` or
//! `gs://bucket/prefix`); object keys handed in by the publisher are placed
//! under that prefix.
//!
//! ## Credentials
//!
//! - `GCS_ACCESS_TOKEN`, when set, is used as the bearer token.
//! - Otherwise the token comes from `gcloud auth print-access-token`, fetched
//!   once on the first upload. Runs that never upload never need credentials.
//! - `GCS_ENDPOINT` overrides the API endpoint (e.g. a local emulator).

use std::env;
use std::path::Path;

use async_trait::async_trait;
use results_push_core::contract::RemoteStore;
use results_push_core::error::StoreError;
use serde::Deserialize;
use tokio::sync::OnceCell;

pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Bucket name and optional key prefix parsed from a `gs://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketUrl {
    pub bucket: String,
    pub prefix: String,
}

impl BucketUrl {
    pub fn parse(url: &str) -> Result<Self, StoreError> {
        let rest = url.strip_prefix("gs://").unwrap_or(url).trim_matches('/');
        let (bucket, prefix) = match rest.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix.trim_matches('/')),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(StoreError::InvalidLocation(url.to_string()));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        })
    }

    pub fn object_name(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadedObject {
    name: String,
    #[serde(default)]
    size: Option<String>,
}

pub struct GcsClient {
    http: reqwest::Client,
    endpoint: String,
    location: BucketUrl,
    token: OnceCell<String>,
}

impl GcsClient {
    pub fn new(location: BucketUrl, endpoint: impl Into<String>, token: Option<String>) -> Self {
        let cell = OnceCell::new();
        if let Some(token) = token {
            // A freshly created cell cannot already be set.
            let _ = cell.set(token);
        }
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            location,
            token: cell,
        }
    }

    /// Build a client for `bucket_url`, reading `GCS_ACCESS_TOKEN` and
    /// `GCS_ENDPOINT` from the environment.
    pub fn new_from_env(bucket_url: &str) -> Result<Self, StoreError> {
        dotenvy::dotenv().ok();
        let location = BucketUrl::parse(bucket_url)?;
        let endpoint = env::var("GCS_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let token = env::var("GCS_ACCESS_TOKEN").ok().filter(|t| !t.is_empty());
        tracing::info!(
            bucket = %location.bucket,
            prefix = %location.prefix,
            endpoint = %endpoint,
            token_from_env = token.is_some(),
            "Initialized GcsClient"
        );
        Ok(Self::new(location, endpoint, token))
    }

    async fn token(&self) -> Result<&str, StoreError> {
        self.token
            .get_or_try_init(fetch_gcloud_token)
            .await
            .map(String::as_str)
    }
}

async fn fetch_gcloud_token() -> Result<String, StoreError> {
    tracing::info!("Fetching access token from gcloud");
    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| StoreError::Credentials(format!("failed to run gcloud: {e}")))?;
    if !output.status.success() {
        return Err(StoreError::Credentials(format!(
            "gcloud exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(StoreError::Credentials("gcloud returned an empty token".into()));
    }
    Ok(token)
}

#[async_trait]
impl RemoteStore for GcsClient {
    async fn put_file(&self, local: &Path, key: &str) -> Result<(), StoreError> {
        let content = match tokio::fs::read(local).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::MissingSource(local.to_path_buf()));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: local.to_path_buf(),
                    source,
                })
            }
        };
        let object = self.location.object_name(key);
        let token = self.token().await?;

        tracing::debug!(
            bucket = %self.location.bucket,
            object = %object,
            bytes = content.len(),
            "Uploading object"
        );
        let url = format!("{}/upload/storage/v1/b/{}/o", self.endpoint, self.location.bucket);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .query(&[("uploadType", "media"), ("name", object.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, object = %object, "Transport error uploading object");
                StoreError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            tracing::error!(status = %status, object = %object, "GCS rejected upload");
            return Err(StoreError::Rejected {
                key: object,
                status: status.as_u16(),
                body,
            });
        }

        match response.json::<UploadedObject>().await {
            Ok(uploaded) => tracing::info!(
                object = %uploaded.name,
                size = uploaded.size.as_deref().unwrap_or("?"),
                "Uploaded object"
            ),
            Err(e) => tracing::warn!(error = ?e, object = %object, "Uploaded, but response was not an object resource"),
        }
        Ok(())
    }
}
