//! 文件上传模块：按大小选择内联/远端上传/拒绝，并管理临时文件与远端文件的生命周期。
//!
//! # Upload Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`strategy`] | Pure size → [`UploadStrategy`] selection |
//! | [`staging`] | Uniquely named transient local files, removed on drop |
//! | [`lifecycle`] | Stage + upload + guaranteed remote deletion |
//!
//! ```rust
//! use gemini_relay::upload::{select_strategy, UploadStrategy};
//!
//! assert_eq!(select_strategy(1024), UploadStrategy::Inline);
//! assert_eq!(select_strategy(4 * 1024 * 1024 + 1), UploadStrategy::RemoteUpload);
//! ```

pub mod lifecycle;
pub mod staging;
pub mod strategy;

pub use lifecycle::{FileLifecycle, RemoteFileGuard};
pub use staging::{sanitize_file_name, StagedFile};
pub use strategy::{
    select_strategy, UploadLimits, UploadStrategy, INLINE_MAX_BYTES, REMOTE_MAX_BYTES,
};
