//! HTTP 服务层：路由、共享状态与服务启动。
//!
//! # Server Module
//!
//! Stateless axum router in front of a [`GenerativeDriver`]. The only shared state is
//! read-only: the driver, the file lifecycle, and the size limits.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `POST /generate-text` | [`handlers::generate_text`] |
//! | `POST /gemini/generate` | [`handlers::generate_multimodal`] |
//! | `POST /generate-from-image` | [`handlers::generate_from_image`] |
//! | `POST /chat` | [`handlers::chat`] |
//! | `GET /health` | [`handlers::health`] |

pub mod handlers;
pub mod request;
pub mod response;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use self::response::{panic_handler, Envelope};
use crate::config::RelayConfig;
use crate::drivers::{GeminiDriver, GenerativeDriver};
use crate::upload::{FileLifecycle, UploadLimits};
use crate::Result;

/// Headroom for multipart boundaries and text fields on top of the file limit.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Shared, read-only handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub driver: Arc<dyn GenerativeDriver>,
    pub files: FileLifecycle,
    pub limits: UploadLimits,
}

impl AppState {
    pub fn new(driver: Arc<dyn GenerativeDriver>, staging_dir: impl Into<PathBuf>) -> Self {
        let files = FileLifecycle::new(driver.clone(), staging_dir);
        Self {
            driver,
            files,
            limits: UploadLimits::default(),
        }
    }

    /// State backed by the real Gemini driver.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let driver: Arc<dyn GenerativeDriver> = Arc::new(GeminiDriver::new(config)?);
        Ok(Self::new(driver, config.staging_dir.clone()))
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }
}

fn body_limit(file_max: u64, text_max: u64) -> DefaultBodyLimit {
    let total = file_max
        .saturating_add(text_max)
        .saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(total).unwrap_or(usize::MAX))
}

/// Build the relay router.
pub fn router(state: AppState) -> Router {
    let limits = state.limits;
    Router::new()
        .route(
            "/generate-text",
            post(handlers::generate_text)
                .layer::<_, Infallible>(CatchPanicLayer::custom(panic_handler(
                    Envelope::Result,
                ))),
        )
        .route(
            "/gemini/generate",
            post(handlers::generate_multimodal)
                .layer::<_, Infallible>(body_limit(limits.upload_max, limits.inline_max))
                .layer::<_, Infallible>(CatchPanicLayer::custom(panic_handler(
                    Envelope::Response,
                ))),
        )
        .route(
            "/generate-from-image",
            post(handlers::generate_from_image)
                .layer::<_, Infallible>(body_limit(limits.inline_max, limits.inline_max))
                .layer::<_, Infallible>(CatchPanicLayer::custom(panic_handler(
                    Envelope::Result,
                ))),
        )
        .route(
            "/chat",
            post(handlers::chat)
                .layer::<_, Infallible>(CatchPanicLayer::custom(panic_handler(
                    Envelope::Data,
                ))),
        )
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.host:config.port` and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        model = %config.model,
        "relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
