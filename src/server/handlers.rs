//! The four relay endpoints plus a liveness probe.
//!
//! Each handler is a thin shell: parse at the boundary, run a `relay_*` function that
//! returns `crate::Result<String>`, then wrap the outcome in the endpoint's envelope.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use super::request::{
    json_body, non_blank, read_multipart, ChatRequest, FilePart, GenerateTextRequest,
    MultipartInput, MultipartLimits,
};
use super::response::{ApiError, Envelope};
use super::AppState;
use crate::extract::extract_text;
use crate::types::{history_to_contents, Content, ContentPart, UploadedFile};
use crate::upload::strategy::{too_large, UploadStrategy};
use crate::{Error, ErrorContext, Result};

/// Instruction sent when a file arrives without a prompt.
pub const DEFAULT_FILE_INSTRUCTION: &str = "Describe or analyze the provided file.";

const TEXT_FALLBACK: &str = "Internal server error.";
const MULTIMODAL_FALLBACK: &str = "Internal server error while processing the file.";
const IMAGE_FALLBACK: &str = "Internal server error while generating from the image.";
const CHAT_FALLBACK: &str = "Internal server error while processing the chat.";

type Reply = std::result::Result<Json<Value>, ApiError>;

fn request_span(endpoint: &'static str, model: &str) -> tracing::Span {
    tracing::info_span!("relay", endpoint, model, request_id = %Uuid::new_v4())
}

/// `POST /generate-text`: `{prompt}` → `{result}`.
pub async fn generate_text(
    State(state): State<AppState>,
    body: std::result::Result<Json<GenerateTextRequest>, JsonRejection>,
) -> Reply {
    let envelope = Envelope::Result;
    let span = request_span("generate-text", state.driver.model());
    async move {
        let request = json_body(body)?;
        relay_text(&state, request).await
    }
    .instrument(span)
    .await
    .map(|text| envelope.ok(text))
    .map_err(|e| envelope.error(e, TEXT_FALLBACK))
}

/// `POST /gemini/generate`: multipart `prompt?` + `file?` → `{success, response}`.
pub async fn generate_multimodal(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Reply {
    let envelope = Envelope::Response;
    let span = request_span("gemini/generate", state.driver.model());
    async move {
        let limits = MultipartLimits {
            file_max: state.limits.upload_max,
            text_max: state.limits.inline_max,
        };
        let input = read_multipart(multipart, "file", limits).await?;
        relay_multimodal(&state, input).await
    }
    .instrument(span)
    .await
    .map(|text| envelope.ok(text))
    .map_err(|e| envelope.error(e, MULTIMODAL_FALLBACK))
}

/// `POST /generate-from-image`: multipart `prompt` + `image` (inline only) → `{result}`.
pub async fn generate_from_image(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Reply {
    let envelope = Envelope::Result;
    let span = request_span("generate-from-image", state.driver.model());
    async move {
        let limits = MultipartLimits {
            file_max: state.limits.inline_max,
            text_max: state.limits.inline_max,
        };
        let input = read_multipart(multipart, "image", limits).await?;
        relay_image(&state, input).await
    }
    .instrument(span)
    .await
    .map(|text| envelope.ok(text))
    .map_err(|e| envelope.error(e, IMAGE_FALLBACK))
}

/// `POST /chat`: `{conversation: [{role, text}]}` → `{success, data}`.
pub async fn chat(
    State(state): State<AppState>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Reply {
    let envelope = Envelope::Data;
    let span = request_span("chat", state.driver.model());
    async move {
        let request = json_body(body)?;
        relay_chat(&state, request).await
    }
    .instrument(span)
    .await
    .map(|text| envelope.ok(text))
    .map_err(|e| envelope.error(e, CHAT_FALLBACK))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn relay_text(state: &AppState, request: GenerateTextRequest) -> Result<String> {
    let prompt = non_blank(request.prompt).ok_or_else(|| {
        Error::validation_with_context(
            "Field \"prompt\" is required.",
            ErrorContext::new().with_field_path("prompt"),
        )
    })?;
    let response = state
        .driver
        .generate_content(&[Content::user_text(prompt)])
        .await?;
    Ok(extract_text(&response))
}

async fn relay_multimodal(state: &AppState, input: MultipartInput) -> Result<String> {
    let MultipartInput { prompt, file } = input;
    if prompt.is_none() && file.is_none() {
        return Err(Error::validation_with_context(
            "Field \"prompt\" or a file is required.",
            ErrorContext::new().with_field_path("prompt"),
        ));
    }

    let mut parts = Vec::with_capacity(2);
    let mut remote = None;

    if let Some(file) = file {
        let file = complete_file(file)?;
        match state.limits.select(file.size) {
            UploadStrategy::Inline => {
                tracing::info!(name = %file.original_name, size = file.size, "sending file inline");
                parts.push(ContentPart::inline(&file.bytes, file.mime_type.as_str()));
            }
            UploadStrategy::RemoteUpload => {
                let guard = state.files.upload_scoped(&file).await?;
                parts.push(ContentPart::file_reference(guard.handle()));
                remote = Some(guard);
            }
            reject @ UploadStrategy::Reject { .. } => {
                return Err(reject
                    .rejection()
                    .unwrap_or_else(|| Error::validation("File too large.")));
            }
        }
    }

    parts.push(ContentPart::text(
        prompt.unwrap_or_else(|| DEFAULT_FILE_INSTRUCTION.to_string()),
    ));
    tracing::debug!(parts = parts.len(), remote = remote.is_some(), "assembled request");

    let outcome = state.driver.generate_content(&[Content::user(parts)]).await;
    // The remote copy goes away whether or not generation worked.
    if let Some(guard) = remote {
        guard.release().await;
    }
    Ok(extract_text(&outcome?))
}

async fn relay_image(state: &AppState, input: MultipartInput) -> Result<String> {
    let MultipartInput { prompt, file } = input;
    let file = file.map(complete_file).transpose()?;
    let (Some(file), Some(prompt)) = (file, prompt) else {
        return Err(Error::validation_with_context(
            "An image file and a prompt are both required.",
            ErrorContext::new().with_field_path("image"),
        ));
    };
    // Images never take the remote path.
    if file.size > state.limits.inline_max {
        return Err(too_large(file.size, state.limits.inline_max));
    }

    let contents = [Content::user(vec![
        ContentPart::inline(&file.bytes, file.mime_type.as_str()),
        ContentPart::text(prompt),
    ])];
    let response = state.driver.generate_content(&contents).await?;
    Ok(extract_text(&response))
}

async fn relay_chat(state: &AppState, request: ChatRequest) -> Result<String> {
    let conversation = request
        .conversation
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            Error::validation_with_context(
                "Conversation history is required.",
                ErrorContext::new().with_field_path("conversation"),
            )
        })?;
    let response = state
        .driver
        .generate_content(&history_to_contents(&conversation))
        .await?;
    Ok(extract_text(&response))
}

fn complete_file(part: FilePart) -> Result<UploadedFile> {
    match part {
        FilePart::Complete(file) => Ok(file),
        FilePart::Oversized { received, limit } => Err(too_large(received, limit)),
    }
}
