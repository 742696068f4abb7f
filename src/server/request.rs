//! Transport-boundary request shapes.
//!
//! JSON endpoints deserialize into small structs; multipart endpoints are drained into a
//! [`MultipartInput`] with byte caps applied while reading. Either way the handlers receive
//! plain values and never touch axum extractors' rejections.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use serde::Deserialize;

use crate::types::{ConversationTurn, UploadedFile};
use crate::upload::strategy::human_size;
use crate::{Error, ErrorContext, Result};

/// Body of `POST /generate-text`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateTextRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub conversation: Option<Vec<ConversationTurn>>,
}

/// Map an axum JSON rejection to a 400.
pub fn json_body<T>(body: std::result::Result<axum::Json<T>, JsonRejection>) -> Result<T> {
    match body {
        Ok(axum::Json(value)) => Ok(value),
        Err(rejection) => {
            let message = match &rejection {
                JsonRejection::JsonDataError(e) => format!("Invalid JSON data: {}", e.body_text()),
                JsonRejection::JsonSyntaxError(e) => {
                    format!("JSON syntax error: {}", e.body_text())
                }
                JsonRejection::MissingJsonContentType(_) => {
                    "Missing Content-Type: application/json header".to_string()
                }
                other => format!("Failed to parse JSON body: {}", other.body_text()),
            };
            Err(Error::validation_with_context(
                message,
                ErrorContext::new().with_source("json_body"),
            ))
        }
    }
}

/// Treat blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The file part of a multipart body.
#[derive(Debug, Clone)]
pub enum FilePart {
    Complete(UploadedFile),
    /// Reading stopped once `received` bytes passed the cap.
    Oversized { received: u64, limit: u64 },
}

/// Fields the relay understands, read out of a multipart body.
#[derive(Debug, Clone, Default)]
pub struct MultipartInput {
    pub prompt: Option<String>,
    pub file: Option<FilePart>,
}

/// Caps applied while draining a multipart body.
#[derive(Debug, Clone, Copy)]
pub struct MultipartLimits {
    pub file_max: u64,
    pub text_max: u64,
}

/// Read `prompt` and the file field named `file_field`. Unknown fields are skipped.
///
/// At most one non-empty file field is accepted; a second one is a validation error.
/// Stops at the first oversized file so that no more of it is buffered.
pub async fn read_multipart(
    multipart: std::result::Result<Multipart, MultipartRejection>,
    file_field: &str,
    limits: MultipartLimits,
) -> Result<MultipartInput> {
    let mut multipart = multipart.map_err(|rejection| {
        Error::validation_with_context(
            format!("Invalid multipart body: {}", rejection.body_text()),
            ErrorContext::new().with_source("multipart"),
        )
    })?;

    let mut input = MultipartInput::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field.file_name().map(String::from);
            let mime_type = field.content_type().map(String::from);
            let unnamed = file_name.as_deref().unwrap_or("").is_empty();
            if input.file.is_some() {
                // A trailing empty placeholder is harmless; any real second file is not.
                if matches!(read_capped(field, 0).await?, Capped::Complete(ref b) if b.is_empty())
                    && unnamed
                {
                    continue;
                }
                return Err(Error::validation_with_context(
                    "Only one file may be uploaded per request.",
                    ErrorContext::new().with_field_path(file_field),
                ));
            }
            match read_capped(field, limits.file_max).await? {
                Capped::Complete(bytes) => {
                    // Browsers send an empty, unnamed part when no file was chosen.
                    if bytes.is_empty() && unnamed {
                        continue;
                    }
                    input.file = Some(FilePart::Complete(UploadedFile::new(
                        bytes, mime_type, file_name,
                    )));
                }
                Capped::Exceeded(received) => {
                    tracing::warn!(
                        field = %name,
                        received,
                        limit = limits.file_max,
                        "multipart file exceeds limit, aborting read"
                    );
                    input.file = Some(FilePart::Oversized {
                        received,
                        limit: limits.file_max,
                    });
                    return Ok(input);
                }
            }
        } else if name == "prompt" {
            match read_capped(field, limits.text_max).await? {
                Capped::Complete(bytes) => {
                    let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                        Error::validation_with_context(
                            "Field \"prompt\" must be valid UTF-8 text.",
                            ErrorContext::new().with_field_path("prompt"),
                        )
                    })?;
                    input.prompt = non_blank(Some(text));
                }
                Capped::Exceeded(_) => {
                    return Err(Error::validation_with_context(
                        format!(
                            "Field \"prompt\" is too long. The maximum is {}.",
                            human_size(limits.text_max)
                        ),
                        ErrorContext::new().with_field_path("prompt"),
                    ));
                }
            }
        } else {
            tracing::debug!(field = %name, "ignoring unknown multipart field");
        }
    }
    Ok(input)
}

enum Capped {
    Complete(Bytes),
    Exceeded(u64),
}

async fn read_capped(mut field: Field<'_>, cap: u64) -> Result<Capped> {
    let mut buf = BytesMut::new();
    let mut received = 0u64;
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                received += chunk.len() as u64;
                if received > cap {
                    return Ok(Capped::Exceeded(received));
                }
                buf.extend_from_slice(&chunk);
            }
            Ok(None) => return Ok(Capped::Complete(buf.freeze())),
            // Body limit hit mid-field: the part is at least this large.
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Ok(Capped::Exceeded(received.max(cap.saturating_add(1))));
            }
            Err(e) => return Err(multipart_error(e)),
        }
    }
}

fn multipart_error(e: MultipartError) -> Error {
    Error::validation_with_context(
        format!("Failed to read multipart data: {}", e.body_text()),
        ErrorContext::new().with_source("multipart"),
    )
}
