//! Gemini REST 驱动 — generateContent、文件上传与删除
//!
//! Google Gemini REST driver. Key points:
//! - `POST /v1beta/models/{model}:generateContent` with a `contents` array of
//!   `{role, parts}`; roles are `user` and `model`.
//! - Large files go through the resumable upload protocol on
//!   `/upload/v1beta/files` and come back as `{file: {name, uri, mimeType}}`.
//! - Uploaded files are deleted with `DELETE /v1beta/{name}`.
//! - The API key travels in the `x-goog-api-key` header.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

use crate::config::RelayConfig;
use crate::transport::HttpTransport;
use crate::types::{Content, RemoteFileHandle};
use crate::{Error, ErrorContext, Result};

use super::GenerativeDriver;

const API_VERSION: &str = "v1beta";

/// Google Gemini generateContent + Files API driver.
#[derive(Debug)]
pub struct GeminiDriver {
    transport: HttpTransport,
    model: String,
}

impl GeminiDriver {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "Model name must not be empty",
                ErrorContext::new().with_field_path("GEMINI_MODEL"),
            ));
        }
        Ok(Self {
            transport: HttpTransport::new(config)?,
            model: config.model.clone(),
        })
    }

    fn generate_path(&self) -> String {
        // Accept both "gemini-2.5-flash" and "models/gemini-2.5-flash".
        let model = self.model.trim_start_matches("models/");
        format!("/{API_VERSION}/models/{model}:generateContent")
    }

    /// Request body for generateContent.
    pub fn build_request(contents: &[Content]) -> Result<Value> {
        Ok(serde_json::json!({
            "contents": serde_json::to_value(contents)?,
        }))
    }
}

#[async_trait]
impl GenerativeDriver for GeminiDriver {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_content(&self, contents: &[Content]) -> Result<Value> {
        let body = Self::build_request(contents)?;
        tracing::debug!(
            model = %self.model,
            turns = contents.len(),
            "calling generateContent"
        );
        self.transport.post_json(&self.generate_path(), &body).await
    }

    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
        size: u64,
    ) -> Result<RemoteFileHandle> {
        let upload_err = |e: Error| match e {
            Error::Remote { status, message } => Error::upload_with_context(
                format!("Remote file upload rejected (HTTP {status}): {message}"),
                ErrorContext::new().with_source("gemini_upload"),
            ),
            other => other,
        };

        let session_url = self
            .transport
            .start_resumable_upload(
                &format!("/upload/{API_VERSION}/files"),
                display_name,
                mime_type,
                size,
            )
            .await
            .map_err(upload_err)?;

        let body = self
            .transport
            .finish_resumable_upload(&session_url, path, size)
            .await
            .map_err(upload_err)?;

        let file = body.get("file").cloned().unwrap_or(body);
        serde_json::from_value::<RemoteFileHandle>(file).map_err(|e| {
            Error::upload_with_context(
                format!("Unexpected file upload response: {e}"),
                ErrorContext::new().with_source("gemini_upload"),
            )
        })
    }

    async fn delete_file(&self, remote_id: &str) -> Result<()> {
        let name = remote_id.trim_start_matches('/');
        self.transport
            .delete(&format!("/{API_VERSION}/{name}"))
            .await
    }
}
