//! 模型驱动抽象层 — 通过 trait 隔离远端生成式 API
//!
//! Driver abstraction for the remote generative model.
//!
//! Handlers and the file lifecycle only see `Arc<dyn GenerativeDriver>`, so the real
//! Gemini client and in-process test doubles are interchangeable.

pub mod gemini;

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

use crate::types::{Content, RemoteFileHandle};
use crate::Result;

pub use gemini::GeminiDriver;

/// The three remote operations the relay needs.
///
/// Every call is a single attempt: implementations must not retry on their own.
#[async_trait]
pub trait GenerativeDriver: Send + Sync + std::fmt::Debug {
    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Run one generation over `contents` and return the raw response body.
    async fn generate_content(&self, contents: &[Content]) -> Result<Value>;

    /// Upload the file at `path` to the remote file API.
    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
        size: u64,
    ) -> Result<RemoteFileHandle>;

    /// Delete a previously uploaded file by its remote id (e.g. `files/abc123`).
    async fn delete_file(&self, remote_id: &str) -> Result<()>;
}
