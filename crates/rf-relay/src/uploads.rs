//! Temporary on-disk storage for uploaded reference images.
//!
//! Every stored file is owned by exactly one [`TempUpload`]; dropping it
//! removes the file, so error paths clean up without extra bookkeeping.

use std::io;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rf_core::{InputError, MAX_IMAGE_BYTES};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::RelayError;
use crate::upstream::InlineImage;

#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    /// Creates the directory when it does not exist yet.
    pub async fn prepare(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens a uniquely named file for one incoming upload.
    pub async fn begin(&self, file_name: Option<String>, mime_type: String) -> io::Result<PendingUpload> {
        let path = self.root.join(Uuid::new_v4().simple().to_string());
        let file = File::create(&path).await?;
        debug!("Receiving upload into {}", path.display());

        Ok(PendingUpload {
            file,
            written: 0,
            upload: TempUpload {
                path,
                file_name: file_name.unwrap_or_else(|| "upload".to_string()),
                mime_type,
                size: 0,
            },
        })
    }
}

/// An upload that is still being streamed to disk.
pub struct PendingUpload {
    file: File,
    written: usize,
    upload: TempUpload,
}

impl PendingUpload {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), RelayError> {
        self.written += chunk.len();
        if self.written > MAX_IMAGE_BYTES {
            return Err(InputError::ImageTooLarge(self.written).into());
        }
        self.file.write_all(chunk).await?;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<TempUpload, RelayError> {
        self.file.flush().await?;
        self.upload.size = self.written;
        let PendingUpload { file, upload, .. } = self;
        drop(file);
        Ok(upload)
    }
}

#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    file_name: String,
    mime_type: String,
    size: usize,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Reads the file into a base64 payload and deletes it.
    pub async fn into_inline(self) -> Result<InlineImage, RelayError> {
        let bytes = fs::read(&self.path).await?;
        let image = InlineImage {
            data: BASE64.encode(&bytes),
            mime_type: self.mime_type.clone(),
        };
        fs::remove_file(&self.path).await?;
        Ok(image)
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temp upload {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove temp upload {}: {e}", self.path.display()),
        }
    }
}
