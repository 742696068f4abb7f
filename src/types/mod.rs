//! 类型系统模块：请求内容、对话轮次与文件句柄。
//!
//! # Types Module
//!
//! Strongly-typed request pieces that the relay assembles before calling the model.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ContentPart`] | Text, inline base64 data, or a remote file reference |
//! | [`Content`] | Role-tagged list of parts, one element of `contents` |
//! | [`ConversationTurn`] | Caller-held chat history entry |
//! | [`UploadedFile`] | File received from the caller for one request |
//! | [`RemoteFileHandle`] | File staged in the remote file API |
//!
//! ## Example
//!
//! ```rust
//! use gemini_relay::types::{Content, ContentPart};
//!
//! let request = Content::user(vec![
//!     ContentPart::inline(b"\x89PNG...", "image/png"),
//!     ContentPart::text("What is in this picture?"),
//! ]);
//! assert_eq!(request.parts.len(), 2);
//! ```

pub mod file;
pub mod message;

pub use file::{RemoteFileHandle, UploadedFile};
pub use message::{history_to_contents, Content, ContentPart, ConversationTurn, Role};
