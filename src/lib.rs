//! # gemini-relay
//!
//! 浏览器聊天界面与 Gemini API 之间的无状态 HTTP 中继服务。
//!
//! Stateless HTTP relay between a browser chat UI and the Gemini generative API.
//! Prompts, files and conversation histories arrive over HTTP, are forwarded to the
//! model, and the answer comes back as plain text in a small JSON envelope.
//!
//! ## Key Features
//!
//! - **Size-aware uploads**: small files travel inline, large ones go through the remote
//!   file API, oversized ones are refused before any upstream call
//! - **Guaranteed cleanup**: staged temp files and remote copies are always released
//! - **Tolerant extraction**: the answer text is pulled out of several response shapes,
//!   with a diagnostic dump instead of an error when none match
//! - **Swappable backend**: handlers talk to a [`drivers::GenerativeDriver`] trait object
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gemini_relay::config::RelayConfig;
//!
//! #[tokio::main]
//! async fn main() -> gemini_relay::Result<()> {
//!     let config = RelayConfig::from_env()?;
//!     gemini_relay::server::serve(config).await
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Environment-driven runtime configuration |
//! | [`drivers`] | Generative backend trait and the Gemini implementation |
//! | [`extract`] | Response text extraction fallback chain |
//! | [`server`] | axum router, handlers and response envelopes |
//! | [`transport`] | Shared HTTP client for the Gemini REST API |
//! | [`types`] | Conversation content and file types |
//! | [`upload`] | Upload strategy selection and file lifecycle |

pub mod config;
pub mod drivers;
pub mod extract;
pub mod server;
pub mod transport;
pub mod types;
pub mod upload;

pub use config::RelayConfig;
pub use extract::extract_text;
pub use types::{Content, ContentPart, ConversationTurn, Role};
pub use upload::{select_strategy, UploadStrategy};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
