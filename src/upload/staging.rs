//! Transient local copies of uploaded files.
//!
//! A [`StagedFile`] owns a uniquely named file in the staging directory and removes it when
//! dropped. Removal failures are logged, never returned.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::{Error, ErrorContext, Result};

static UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9.]").expect("static regex"));

const MAX_NAME_LEN: usize = 64;

/// Replace everything outside `[A-Za-z0-9.]` with `_` and cap the length.
///
/// Separators become `_`, so the result is always a single path component.
pub fn sanitize_file_name(original: &str) -> String {
    let mut cleaned = UNSAFE_NAME_CHARS.replace_all(original, "_").into_owned();
    // only ASCII survives the replacement
    cleaned.truncate(MAX_NAME_LEN);
    if cleaned.is_empty() {
        cleaned.push_str("file");
    }
    cleaned
}

/// A file written to the staging directory, deleted on drop.
#[derive(Debug)]
pub struct StagedFile {
    file: Option<NamedTempFile>,
    size: u64,
}

impl StagedFile {
    /// Write `bytes` to a new file named `<millis>-<random>-<sanitized name>` inside `dir`.
    ///
    /// The random component and exclusive creation keep concurrent requests from colliding.
    /// The payload is written through the file handle in bounded chunks, never duplicated.
    pub async fn write(dir: &Path, bytes: &[u8], original_name: &str) -> Result<Self> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let prefix = format!("{millis}-");
        let suffix = format!("-{}", sanitize_file_name(original_name));

        let dir_buf = dir.to_path_buf();
        let (file, handle) = tokio::task::spawn_blocking(move || {
            let file = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(&suffix)
                .rand_bytes(12)
                .tempfile_in(&dir_buf)?;
            let handle = file.reopen()?;
            Ok::<_, std::io::Error>((file, handle))
        })
        .await
        .map_err(|e| staging_error("create", dir, std::io::Error::other(e)))?
        .map_err(|e| staging_error("create", dir, e))?;

        // From here on, dropping `staged` removes the file on every exit path.
        let staged = StagedFile {
            file: Some(file),
            size: bytes.len() as u64,
        };
        let mut out = tokio::fs::File::from_std(handle);
        out.write_all(bytes)
            .await
            .map_err(|e| staging_error("write", staged.path(), e))?;
        out.flush()
            .await
            .map_err(|e| staging_error("write", staged.path(), e))?;
        tracing::debug!(path = %staged.path().display(), size = staged.size, "staged upload");
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        self.file
            .as_ref()
            .map(NamedTempFile::path)
            .unwrap_or_else(|| Path::new(""))
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Delete the file on the blocking pool and wait for it. Failures are logged.
    pub async fn remove(mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        let path = file.path().to_path_buf();
        match tokio::task::spawn_blocking(move || file.close()).await {
            Ok(result) => log_removal(&path, result),
            Err(e) => log_removal(&path, Err(std::io::Error::other(e))),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // Reached only when `remove` was skipped (cancellation, early error).
        if let Some(file) = self.file.take() {
            let path: PathBuf = file.path().to_path_buf();
            log_removal(&path, file.close());
        }
    }
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "removed staged file"),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove staged file"
        ),
    }
}

fn staging_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::upload_with_context(
        format!("Failed to {action} transient upload file: {e}"),
        ErrorContext::new()
            .with_details(path.display().to_string())
            .with_source("staging"),
    )
}
