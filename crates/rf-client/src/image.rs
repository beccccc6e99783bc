use std::path::Path;

use rf_core::{InputError, ReferenceImage};
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ImageLoadError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Invalid(#[from] InputError),
}

/// Reads a file and identifies it from its content, not its extension.
pub async fn load_reference_image(path: impl AsRef<Path>) -> Result<ReferenceImage, ImageLoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).await.map_err(|source| ImageLoadError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    Ok(ReferenceImage::sniff(file_name, bytes)?)
}
