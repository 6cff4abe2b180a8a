//! Gateway Client
//!
//! HTTP client for the ecstore gateway.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Response to `POST /upload`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub size: u64,
    pub fragments_stored: usize,
    pub fragments_failed: usize,
    pub degraded: bool,
}

/// One entry of `GET /status`
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    pub id: usize,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub status: String,
}

impl NodeStatus {
    pub fn is_alive(&self) -> bool {
        self.status == "alive"
    }
}

/// One entry of `GET /objects`
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    pub size: u64,
    pub data_fragments: usize,
    pub parity_fragments: usize,
    pub node_count: usize,
    pub content_hash: String,
    pub uploaded_at: String,
}

/// Gateway client
pub struct GatewayClient {
    client: Client,
    base: Url,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url));
        }
        let client = Client::builder().timeout(Duration::from_secs(300)).build()?;
        Ok(Self {
            client,
            base,
            base_url,
        })
    }

    /// Gateway URL with `segments` appended, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check gateway health
    pub async fn health(&self) -> Result<bool> {
        let url = self.endpoint(&["health"])?;
        let response = self.client.get(url).send().await?;
        Ok(response.status().is_success())
    }

    /// Upload a local file under its file name
    pub async fn upload_file(&self, path: &Path) -> Result<UploadResponse> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::InvalidPath(path.display().to_string()))?
            .to_string();
        let data = tokio::fs::read(path).await?;

        let form = Form::new().part("file", Part::bytes(data).file_name(file_name));
        let url = self.endpoint(&["upload"])?;
        let response = self.client.post(url).multipart(form).send().await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(api_error(response).await)
        }
    }

    /// Download an object
    pub async fn download(&self, name: &str) -> Result<Bytes> {
        let url = self.endpoint(&["download", name])?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            s if s.is_success() => Ok(response.bytes().await?),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(name.to_string())),
            _ => Err(api_error(response).await),
        }
    }

    /// Liveness of every storage node
    pub async fn status(&self) -> Result<Vec<NodeStatus>> {
        let url = self.endpoint(&["status"])?;
        let response = self.client.get(url).send().await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(api_error(response).await)
        }
    }

    /// Objects known to the gateway
    pub async fn list_objects(&self) -> Result<Vec<ObjectInfo>> {
        let url = self.endpoint(&["objects"])?;
        let response = self.client.get(url).send().await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(api_error(response).await)
        }
    }
}

async fn api_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ClientError::Api {
        status,
        message: error_message(&body),
    }
}

/// Pull `error` (and `details`) out of a JSON error body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match (json["error"].as_str(), json["details"].as_str()) {
            (Some(error), Some(details)) => format!("{} ({})", error, details),
            (Some(error), None) => error.to_string(),
            _ => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}
