use crate::config::RelayConfig;
use crate::{Error, Result};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Proxy, Response};
use serde_json::Value;
use std::env;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Thin wrapper over `reqwest::Client` that knows the base URL, the key, and the timeouts.
///
/// No retries happen here. A failed call is reported once and the caller decides.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    upload_timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("upload_timeout", &self.upload_timeout)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(
                env::var("GEMINI_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("GEMINI_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            upload_timeout: config.upload_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// POST a JSON body and decode a JSON answer.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(TransportError::Http)?;
        let response = Self::ensure_success(response).await?;
        let json = response.json().await.map_err(TransportError::Http)?;
        Ok(json)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(TransportError::Http)?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Open a resumable upload session and return the session URL.
    pub async fn start_resumable_upload(
        &self,
        path: &str,
        display_name: &str,
        mime_type: &str,
        size: u64,
    ) -> Result<String> {
        let response = self
            .client
            .post(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(TransportError::Http)?;
        let response = Self::ensure_success(response).await?;

        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| Error::Transport(TransportError::MissingUploadUrl))
    }

    /// Stream the file at `file_path` into the session and finalize it.
    pub async fn finish_resumable_upload(
        &self,
        upload_url: &str,
        file_path: &Path,
        size: u64,
    ) -> Result<Value> {
        let file = tokio::fs::File::open(file_path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .client
            .post(upload_url)
            .timeout(self.upload_timeout)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_LENGTH, size.to_string())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(body)
            .send()
            .await
            .map_err(TransportError::Http)?;
        let response = Self::ensure_success(response).await?;
        let json = response.json().await.map_err(TransportError::Http)?;
        Ok(json)
    }

    /// Turn any non-2xx answer into [`Error::Remote`], surfacing the API's own message.
    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);
        let text = response.text().await.unwrap_or_default();
        let parsed = if is_json { remote_message(&text) } else { None };
        let message = parsed.unwrap_or_else(|| {
            if text.trim().is_empty() {
                format!("Remote API returned HTTP {}", status.as_u16())
            } else {
                text.trim().to_string()
            }
        });
        Err(Error::Remote {
            status: status.as_u16(),
            message,
        })
    }
}

/// `{"error": {"message": ...}}` is what the API sends on failure.
fn remote_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v.pointer("/error/message")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload session response carried no upload URL")]
    MissingUploadUrl,

    #[error("Transport error: {0}")]
    Other(String),
}
