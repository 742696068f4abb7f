//! Stage, upload, and always clean up.
//!
//! The local staged copy is gone once [`FileLifecycle::stage_and_upload`] returns, whatever
//! the outcome. The remote copy is owned by a [`RemoteFileGuard`] and deleted exactly once:
//! by [`RemoteFileGuard::release`] on the normal path, or by the guard's `Drop` when the
//! request future is cancelled or unwinds first.

use std::path::PathBuf;
use std::sync::Arc;

use crate::drivers::GenerativeDriver;
use crate::types::{RemoteFileHandle, UploadedFile};
use crate::{Error, ErrorContext, Result};

use super::staging::StagedFile;

/// Owns the staging directory and the driver used for remote file calls.
#[derive(Debug, Clone)]
pub struct FileLifecycle {
    driver: Arc<dyn GenerativeDriver>,
    staging_dir: PathBuf,
}

impl FileLifecycle {
    pub fn new(driver: Arc<dyn GenerativeDriver>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            driver,
            staging_dir: staging_dir.into(),
        }
    }

    /// Write `bytes` to a transient file, upload it, and remove the transient file.
    ///
    /// Fails with [`crate::Error::Upload`] when staging fails or the remote API refuses
    /// the file. Local removal failures are only logged.
    pub async fn stage_and_upload(
        &self,
        bytes: &[u8],
        mime_type: &str,
        original_name: &str,
    ) -> Result<RemoteFileHandle> {
        let staged = StagedFile::write(&self.staging_dir, bytes, original_name).await?;
        let handle = self
            .driver
            .upload_file(staged.path(), mime_type, original_name, staged.size())
            .await;
        staged.remove().await;

        let handle = handle?;
        tracing::info!(
            remote_id = %handle.remote_id,
            uri = %handle.uri,
            name = original_name,
            "uploaded file to remote file API"
        );
        Ok(handle)
    }

    /// Best-effort remote deletion. Failures are logged and swallowed.
    pub async fn release_remote(&self, handle: &RemoteFileHandle) {
        delete_logged(self.driver.as_ref(), handle).await;
    }

    /// [`Self::stage_and_upload`] wrapped in a guard that owns the remote copy.
    ///
    /// The upload runs as its own task. If the caller is dropped mid-upload, the task still
    /// finishes and its unclaimed guard deletes the remote file.
    pub async fn upload_scoped(&self, file: &UploadedFile) -> Result<RemoteFileGuard> {
        let lifecycle = self.clone();
        let file = file.clone();
        let task = tokio::spawn(async move {
            let handle = lifecycle
                .stage_and_upload(&file.bytes, &file.mime_type, &file.original_name)
                .await?;
            Ok(RemoteFileGuard {
                handle,
                driver: Some(lifecycle.driver),
            })
        });
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(Error::upload_with_context(
                format!("Upload task did not complete: {e}"),
                ErrorContext::new().with_source("lifecycle"),
            )),
        }
    }
}

/// Scoped ownership of one remote file.
///
/// Holding the driver is what makes the guard live; `release` and `Drop` both take it, so
/// deletion runs once.
#[derive(Debug)]
#[must_use = "dropping the guard deletes the remote file in the background"]
pub struct RemoteFileGuard {
    handle: RemoteFileHandle,
    driver: Option<Arc<dyn GenerativeDriver>>,
}

impl RemoteFileGuard {
    pub fn handle(&self) -> &RemoteFileHandle {
        &self.handle
    }

    /// Delete the remote file and wait for the outcome. Never fails.
    pub async fn release(mut self) {
        if let Some(driver) = self.driver.take() {
            delete_logged(driver.as_ref(), &self.handle).await;
        }
    }
}

impl Drop for RemoteFileGuard {
    fn drop(&mut self) {
        let Some(driver) = self.driver.take() else {
            return;
        };
        let handle = self.handle.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::debug!(remote_id = %handle.remote_id, "releasing remote file from drop");
                runtime.spawn(async move {
                    delete_logged(driver.as_ref(), &handle).await;
                });
            }
            Err(_) => tracing::warn!(
                remote_id = %handle.remote_id,
                "no async runtime available; remote file was not deleted"
            ),
        }
    }
}

async fn delete_logged(driver: &dyn GenerativeDriver, handle: &RemoteFileHandle) {
    match driver.delete_file(&handle.remote_id).await {
        Ok(()) => tracing::info!(remote_id = %handle.remote_id, "deleted remote file"),
        Err(e) => tracing::warn!(
            remote_id = %handle.remote_id,
            error = %e,
            "failed to delete remote file"
        ),
    }
}
