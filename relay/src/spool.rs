//! Temp-file spooling for in-flight uploads.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::errors::{Error, Result};

/// One request's uploaded file, spooled to disk under a generated name.
///
/// The file is exclusively owned by the request that created it; concurrent
/// requests never share a spool path. Dropping the guard deletes the file, so
/// every exit path out of the handler (success, upstream failure, unwind)
/// releases it. A failed deletion is logged and otherwise ignored - it must
/// never disturb a response that has already been committed.
pub struct SpooledFile {
    path: PathBuf,
    original_name: String,
    size: u64,
    content_type: Option<String>,
}

impl SpooledFile {
    /// Stream a multipart field to `<dir>/<uuid>`.
    pub async fn from_field(dir: &Path, mut field: Field<'_>) -> Result<Self> {
        let id = Uuid::new_v4();
        let original_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("upload_{id}"));
        let content_type = field.content_type().map(|s| s.to_string());

        let path = dir.join(id.to_string());
        let mut file = File::create(&path).await.map_err(|e| Error::Internal {
            operation: format!("create spool file {}: {e}", path.display()),
        })?;

        // Guard is live from here on, so a failed write still cleans up.
        let mut spooled = Self {
            path,
            original_name,
            size: 0,
            content_type,
        };

        while let Some(chunk) = field.chunk().await.map_err(|e| Error::BadRequest {
            message: format!("Failed to read file chunk: {e}"),
        })? {
            spooled.size += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(|e| Error::Internal {
                operation: format!("write spool file {}: {e}", spooled.path.display()),
            })?;
        }

        file.flush().await.map_err(|e| Error::Internal {
            operation: format!("flush spool file {}: {e}", spooled.path.display()),
        })?;

        tracing::debug!(
            path = %spooled.path.display(),
            filename = spooled.original_name,
            size_bytes = spooled.size,
            "Spooled upload to disk"
        );

        Ok(spooled)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Client-supplied filename, or a generated fallback when the part had none
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl Drop for SpooledFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "File cleanup failed");
        }
    }
}
