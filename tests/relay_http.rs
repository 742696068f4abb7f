//! End-to-end HTTP tests for the relay router with an in-process driver.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::future::IntoFuture;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use gemini_relay::drivers::GenerativeDriver;
use gemini_relay::server::handlers::DEFAULT_FILE_INSTRUCTION;
use gemini_relay::server::{router, AppState};
use gemini_relay::types::RemoteFileHandle;
use gemini_relay::upload::UploadLimits;
use gemini_relay::{Content, Error, Result};

/// Records every call and answers with a fixed reply.
#[derive(Debug, Default)]
struct FakeGemini {
    fail_generate: bool,
    panic_generate: bool,
    reply: Option<Value>,
    generated: Mutex<Vec<Value>>,
    uploads: Mutex<Vec<(PathBuf, u64, bool)>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeGemini {
    fn replying(text: &str) -> Self {
        Self {
            reply: Some(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
            })),
            ..Default::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail_generate: true,
            ..Default::default()
        }
    }

    fn generated(&self) -> Vec<Value> {
        self.generated.lock().unwrap().clone()
    }

    fn uploads(&self) -> Vec<(PathBuf, u64, bool)> {
        self.uploads.lock().unwrap().clone()
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeDriver for FakeGemini {
    fn model(&self) -> &str {
        "fake-model"
    }

    async fn generate_content(&self, contents: &[Content]) -> Result<Value> {
        self.generated
            .lock()
            .unwrap()
            .push(serde_json::to_value(contents)?);
        if self.panic_generate {
            panic!("backend exploded");
        }
        if self.fail_generate {
            return Err(Error::Remote {
                status: 503,
                message: "The model is overloaded.".into(),
            });
        }
        Ok(self.reply.clone().unwrap_or_else(|| json!({})))
    }

    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        _display_name: &str,
        size: u64,
    ) -> Result<RemoteFileHandle> {
        let existed = path.exists();
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_path_buf(), size, existed));
        Ok(RemoteFileHandle {
            remote_id: "files/fake-1".into(),
            uri: "https://files.example/fake-1".into(),
            mime_type: mime_type.to_string(),
        })
    }

    async fn delete_file(&self, remote_id: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(remote_id.to_string());
        Ok(())
    }
}

struct Harness {
    server: TestServer,
    driver: Arc<FakeGemini>,
    _staging: tempfile::TempDir,
}

fn harness(driver: FakeGemini, limits: UploadLimits) -> Harness {
    let driver = Arc::new(driver);
    let staging = tempfile::tempdir().unwrap();
    let state = AppState::new(driver.clone(), staging.path()).with_limits(limits);
    let server = TestServer::new(router(state)).unwrap();
    Harness {
        server,
        driver,
        _staging: staging,
    }
}

fn small_limits() -> UploadLimits {
    UploadLimits::new(16, 64)
}

fn file_part(len: usize, name: &str, mime: &str) -> Part {
    Part::bytes(vec![b'a'; len]).file_name(name).mime_type(mime)
}

#[tokio::test]
async fn health_reports_ok() {
    let h = harness(FakeGemini::default(), UploadLimits::default());
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({"status": "ok"}));
}

#[tokio::test]
async fn generate_text_returns_result() {
    let h = harness(FakeGemini::replying("Hi there"), UploadLimits::default());
    let response = h
        .server
        .post("/generate-text")
        .json(&json!({"prompt": "Hello"}))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"result": "Hi there"}));
    let sent = h.driver.generated();
    assert_eq!(sent[0][0]["parts"][0]["text"], "Hello");
}

#[tokio::test]
async fn generate_text_requires_prompt() {
    let h = harness(FakeGemini::replying("unused"), UploadLimits::default());
    for body in [json!({}), json!({"prompt": ""})] {
        let response = h.server.post("/generate-text").json(&body).await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("prompt"));
    }
    assert!(h.driver.generated().is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request_in_envelope() {
    let h = harness(FakeGemini::default(), UploadLimits::default());
    let response = h
        .server
        .post("/chat")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn unmatched_response_yields_diagnostic_not_error() {
    let h = harness(FakeGemini::default(), UploadLimits::default());
    let response = h
        .server
        .post("/generate-text")
        .json(&json!({"prompt": "Hello"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let text = body["result"].as_str().unwrap();
    assert!(gemini_relay::extract::is_diagnostic(text));
}

#[tokio::test]
async fn upstream_failure_is_500_with_message() {
    let h = harness(FakeGemini::failing(), UploadLimits::default());
    let response = h
        .server
        .post("/generate-text")
        .json(&json!({"prompt": "Hello"}))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({"error": "The model is overloaded."}));
}

#[tokio::test]
async fn chat_forwards_history_in_order() {
    let h = harness(FakeGemini::replying("Paris."), UploadLimits::default());
    let response = h
        .server
        .post("/chat")
        .json(&json!({"conversation": [
            {"role": "user", "text": "Hi"},
            {"role": "model", "text": "Hello!"},
            {"role": "user", "text": "Capital of France?"}
        ]}))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"success": true, "data": "Paris."}));
    let sent = h.driver.generated()[0].clone();
    assert_eq!(sent.as_array().unwrap().len(), 3);
    assert_eq!(sent[1]["role"], "model");
    assert_eq!(sent[2]["parts"][0]["text"], "Capital of France?");
}

#[tokio::test]
async fn chat_rejects_empty_or_missing_conversation() {
    let h = harness(FakeGemini::replying("unused"), UploadLimits::default());
    for body in [json!({}), json!({"conversation": []})] {
        let response = h.server.post("/chat").json(&body).await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("Conversation"));
    }
    assert!(h.driver.generated().is_empty());
}

#[tokio::test]
async fn chat_rejects_unknown_role() {
    let h = harness(FakeGemini::replying("unused"), UploadLimits::default());
    let response = h
        .server
        .post("/chat")
        .json(&json!({"conversation": [{"role": "system", "text": "x"}]}))
        .await;
    response.assert_status_bad_request();
    assert!(h.driver.generated().is_empty());
}

#[tokio::test]
async fn multimodal_text_only() {
    let h = harness(FakeGemini::replying("Answer"), UploadLimits::default());
    let response = h
        .server
        .post("/gemini/generate")
        .multipart(MultipartForm::new().add_text("prompt", "Hello"))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({"success": true, "response": "Answer"}));
    assert!(h.driver.uploads().is_empty());
}

#[tokio::test]
async fn multimodal_requires_prompt_or_file() {
    let h = harness(FakeGemini::replying("unused"), UploadLimits::default());
    let response = h
        .server
        .post("/gemini/generate")
        .multipart(MultipartForm::new().add_text("prompt", "   "))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    assert!(h.driver.generated().is_empty());
}

#[tokio::test]
async fn multimodal_small_file_goes_inline_with_default_instruction() {
    let h = harness(FakeGemini::replying("A PDF."), small_limits());
    let response = h
        .server
        .post("/gemini/generate")
        .multipart(MultipartForm::new().add_part("file", file_part(16, "a.pdf", "application/pdf")))
        .await;

    response.assert_status_ok();
    let sent = h.driver.generated()[0].clone();
    let parts = sent[0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
    assert_eq!(parts[1]["text"], DEFAULT_FILE_INSTRUCTION);
    assert!(h.driver.uploads().is_empty());
    assert!(h.driver.deleted().is_empty());
}

#[tokio::test]
async fn multimodal_large_file_is_uploaded_then_deleted_once() {
    let h = harness(FakeGemini::replying("A video."), small_limits());
    let form = MultipartForm::new()
        .add_text("prompt", "Summarize")
        .add_part("file", file_part(17, "clip one.mp4", "video/mp4"));
    let response = h.server.post("/gemini/generate").multipart(form).await;

    response.assert_status_ok();
    response.assert_json(&json!({"success": true, "response": "A video."}));

    let uploads = h.driver.uploads();
    assert_eq!(uploads.len(), 1);
    let (staged_path, size, existed) = &uploads[0];
    assert_eq!(*size, 17);
    assert!(*existed, "staged file should exist during upload");
    assert!(!staged_path.exists(), "staged file should be removed");
    assert!(staged_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("clip_one.mp4"));

    let parts = h.driver.generated()[0][0]["parts"].clone();
    assert_eq!(parts[0]["fileData"]["fileUri"], "https://files.example/fake-1");
    assert_eq!(parts[1]["text"], "Summarize");
    assert_eq!(h.driver.deleted(), vec!["files/fake-1".to_string()]);
}

#[tokio::test]
async fn multimodal_remote_file_deleted_when_generation_fails() {
    let h = harness(FakeGemini::failing(), small_limits());
    let form = MultipartForm::new()
        .add_text("prompt", "Summarize")
        .add_part("file", file_part(40, "big.bin", "application/octet-stream"));
    let response = h.server.post("/gemini/generate").multipart(form).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({"success": false, "error": "The model is overloaded."}));
    assert_eq!(h.driver.uploads().len(), 1);
    assert_eq!(h.driver.deleted(), vec!["files/fake-1".to_string()]);
}

#[tokio::test]
async fn multimodal_oversized_file_is_rejected_without_upstream_calls() {
    let h = harness(FakeGemini::replying("unused"), small_limits());
    let form = MultipartForm::new()
        .add_text("prompt", "Summarize")
        .add_part("file", file_part(65, "huge.bin", "application/octet-stream"));
    let response = h.server.post("/gemini/generate").multipart(form).await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("File too large"));
    assert!(message.contains("64 bytes"));
    assert!(h.driver.uploads().is_empty());
    assert!(h.driver.generated().is_empty());
}

#[tokio::test]
async fn multimodal_second_file_is_rejected() {
    let h = harness(FakeGemini::replying("unused"), small_limits());
    let form = MultipartForm::new()
        .add_text("prompt", "Compare")
        .add_part("file", file_part(8, "first.txt", "text/plain"))
        .add_part("file", file_part(40, "second.bin", "application/octet-stream"));
    let response = h.server.post("/gemini/generate").multipart(form).await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Only one file"));
    assert!(h.driver.uploads().is_empty());
    assert!(h.driver.generated().is_empty());
    assert!(h.driver.deleted().is_empty());
}

#[tokio::test]
async fn multimodal_just_over_inline_limit_uses_remote_path() {
    let h = harness(FakeGemini::replying("ok"), UploadLimits::default());
    let size = gemini_relay::upload::INLINE_MAX_BYTES as usize + 1;
    let form = MultipartForm::new().add_part("file", file_part(size, "scan.pdf", "application/pdf"));
    let response = h.server.post("/gemini/generate").multipart(form).await;

    response.assert_status_ok();
    let uploads = h.driver.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1, size as u64);
    assert_eq!(h.driver.deleted().len(), 1);
}

#[tokio::test]
async fn image_endpoint_sends_inline_image_then_prompt() {
    let h = harness(FakeGemini::replying("A cat."), small_limits());
    let form = MultipartForm::new()
        .add_text("prompt", "What is this?")
        .add_part("image", file_part(10, "cat.jpg", "image/jpeg"));
    let response = h.server.post("/generate-from-image").multipart(form).await;

    response.assert_status_ok();
    response.assert_json(&json!({"result": "A cat."}));
    let parts = h.driver.generated()[0][0]["parts"].clone();
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[1]["text"], "What is this?");
    assert!(h.driver.uploads().is_empty());
}

#[tokio::test]
async fn image_endpoint_requires_both_fields() {
    let h = harness(FakeGemini::replying("unused"), small_limits());
    let response = h
        .server
        .post("/generate-from-image")
        .multipart(MultipartForm::new().add_part("image", file_part(10, "cat.jpg", "image/jpeg")))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].is_string());

    let response = h
        .server
        .post("/generate-from-image")
        .multipart(MultipartForm::new().add_text("prompt", "What is this?"))
        .await;
    response.assert_status_bad_request();
    assert!(h.driver.generated().is_empty());
}

#[tokio::test]
async fn image_over_inline_limit_is_rejected_without_upload() {
    let h = harness(FakeGemini::replying("unused"), small_limits());
    let form = MultipartForm::new()
        .add_text("prompt", "What is this?")
        .add_part("image", file_part(17, "cat.jpg", "image/jpeg"));
    let response = h.server.post("/generate-from-image").multipart(form).await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("File too large"));
    assert!(h.driver.generated().is_empty());
    assert!(h.driver.uploads().is_empty());
}

#[tokio::test]
async fn concurrent_uploads_each_release_their_remote_file() {
    let h = harness(FakeGemini::replying("ok"), small_limits());
    let requests = (0..8).map(|i| {
        let form = MultipartForm::new()
            .add_text("prompt", format!("request {i}"))
            .add_part("file", file_part(32, "shared.bin", "application/octet-stream"));
        h.server.post("/gemini/generate").multipart(form).into_future()
    });
    for response in futures::future::join_all(requests).await {
        response.assert_status_ok();
    }

    let uploads = h.driver.uploads();
    assert_eq!(uploads.len(), 8);
    let mut paths: Vec<_> = uploads.iter().map(|(p, _, _)| p.clone()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 8, "staged names must not collide");
    assert!(paths.iter().all(|p| !p.exists()));
    assert_eq!(h.driver.deleted().len(), 8);
}

#[tokio::test]
async fn handler_panic_becomes_500_in_endpoint_envelope() {
    let driver = FakeGemini {
        panic_generate: true,
        ..Default::default()
    };
    let h = harness(driver, UploadLimits::default());
    let response = h
        .server
        .post("/chat")
        .json(&json!({"conversation": [{"role": "user", "text": "Hi"}]}))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({"success": false, "message": "Internal server error."}));
}
