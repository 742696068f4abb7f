//! Response envelopes and error rendering.
//!
//! Each endpoint speaks its own JSON shape:
//!
//! | Envelope | Success | Failure |
//! |----------|---------|---------|
//! | [`Envelope::Result`] | `{result}` | `{error}` |
//! | [`Envelope::Response`] | `{success: true, response}` | `{success: false, error}` |
//! | [`Envelope::Data`] | `{success: true, data}` | `{success: false, message}` |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::any::Any;

use crate::Error;

/// Fallback message when a panic escapes a handler.
pub const PANIC_MESSAGE: &str = "Internal server error.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `/generate-text`, `/generate-from-image`
    Result,
    /// `/gemini/generate`
    Response,
    /// `/chat`
    Data,
}

impl Envelope {
    pub fn ok(self, text: String) -> Json<Value> {
        Json(match self {
            Envelope::Result => json!({ "result": text }),
            Envelope::Response => json!({ "success": true, "response": text }),
            Envelope::Data => json!({ "success": true, "data": text }),
        })
    }

    pub fn failure_body(self, message: &str) -> Value {
        match self {
            Envelope::Result => json!({ "error": message }),
            Envelope::Response => json!({ "success": false, "error": message }),
            Envelope::Data => json!({ "success": false, "message": message }),
        }
    }

    /// Bind `error` to this envelope; `fallback` replaces an empty message.
    pub fn error(self, error: Error, fallback: &'static str) -> ApiError {
        ApiError {
            error,
            envelope: self,
            fallback,
        }
    }
}

/// An [`Error`] on its way out of a specific endpoint.
#[derive(Debug)]
pub struct ApiError {
    pub error: Error,
    pub envelope: Envelope,
    pub fallback: &'static str,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        if self.error.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Message shown to the caller: the underlying one, or the endpoint fallback.
    pub fn user_message(&self) -> String {
        let message = self.error.to_string();
        if message.trim().is_empty() {
            self.fallback.to_string()
        } else {
            message
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.error, "request failed");
        } else {
            tracing::debug!(error = %self.error, "rejected request");
        }
        let body = self.envelope.failure_body(&self.user_message());
        (status, Json(body)).into_response()
    }
}

/// Renders a caught panic as a 500 in `envelope`'s failure shape.
pub fn panic_response(envelope: Envelope, panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(envelope.failure_body(PANIC_MESSAGE)),
    )
        .into_response()
}

/// Panic handler for `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_handler(
    envelope: Envelope,
) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static {
    move |panic| panic_response(envelope, panic)
}
