//! Files as they move through one request: received from the caller, then possibly staged remotely.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Fallback display name when the caller sends a file without one.
pub const DEFAULT_FILE_NAME: &str = "uploaded_file";
/// MIME type assumed when the multipart part declares none.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A file received in a multipart request. Lives only as long as the handler that owns it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Bytes,
    pub mime_type: String,
    pub original_name: String,
    pub size: u64,
}

impl UploadedFile {
    pub fn new(bytes: Bytes, mime_type: Option<String>, original_name: Option<String>) -> Self {
        let size = bytes.len() as u64;
        Self {
            bytes,
            mime_type: mime_type
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            original_name: original_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
            size,
        }
    }
}

/// Handle to a file held by the remote file API.
///
/// Deserializes from the API's file resource (`name`, `uri`, `mimeType`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileHandle {
    #[serde(rename = "name")]
    pub remote_id: String,
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}
