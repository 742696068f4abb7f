//! Size-tiered choice between inline bytes, the remote file API, and rejection.

use crate::{Error, ErrorContext};

/// Largest file sent inline as base64 (4 MiB).
pub const INLINE_MAX_BYTES: u64 = 4 * 1024 * 1024;
/// Largest file the remote file API accepts (2 GiB).
pub const REMOTE_MAX_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// How a file of a given size reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    Inline,
    RemoteUpload,
    Reject { size: u64, limit: u64 },
}

impl UploadStrategy {
    /// The 400 error for a rejected size; `None` for the accepting strategies.
    pub fn rejection(&self) -> Option<Error> {
        match *self {
            UploadStrategy::Reject { size, limit } => Some(too_large(size, limit)),
            _ => None,
        }
    }
}

/// Size thresholds. Defaults are the API's own limits; tests shrink them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub inline_max: u64,
    pub upload_max: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            inline_max: INLINE_MAX_BYTES,
            upload_max: REMOTE_MAX_BYTES,
        }
    }
}

impl UploadLimits {
    pub fn new(inline_max: u64, upload_max: u64) -> Self {
        Self {
            inline_max,
            upload_max: upload_max.max(inline_max),
        }
    }

    /// Total over `size`; boundaries are inclusive on the accepting side.
    pub fn select(&self, size: u64) -> UploadStrategy {
        if size <= self.inline_max {
            UploadStrategy::Inline
        } else if size <= self.upload_max {
            UploadStrategy::RemoteUpload
        } else {
            UploadStrategy::Reject {
                size,
                limit: self.upload_max,
            }
        }
    }
}

/// [`UploadLimits::select`] with the default 4 MiB / 2 GiB thresholds.
pub fn select_strategy(size: u64) -> UploadStrategy {
    UploadLimits::default().select(size)
}

/// Validation error naming the offending size and the limit it broke.
pub fn too_large(size: u64, limit: u64) -> Error {
    Error::validation_with_context(
        format!(
            "File too large ({} bytes). The maximum supported size is {} ({} bytes).",
            size,
            human_size(limit),
            limit
        ),
        ErrorContext::new()
            .with_field_path("file")
            .with_details(format!("size={size} limit={limit}")),
    )
}

/// `4194304` -> `4 MiB`; falls back to bytes when not a whole unit.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1 << 30, "GiB"), (1 << 20, "MiB"), (1 << 10, "KiB")];
    for (unit, label) in UNITS {
        if bytes >= unit && bytes % unit == 0 {
            return format!("{} {}", bytes / unit, label);
        }
    }
    format!("{bytes} bytes")
}
