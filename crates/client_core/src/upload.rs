//! Local image files: reading them for previews and multipart uploads.

use std::path::{Path, PathBuf};

use reqwest::multipart::Part;

use crate::{data_url, error::ClientError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path).first_raw().map(str::to_string);
        Ok(Self {
            filename,
            mime_type,
            bytes,
        })
    }

    pub fn to_data_url(&self) -> String {
        data_url::encode(self.mime_type.as_deref(), &self.bytes)
    }

    pub(crate) fn into_part(self) -> Result<Part, ClientError> {
        let part = Part::bytes(self.bytes).file_name(self.filename);
        match self.mime_type {
            Some(mime_type) => Ok(part.mime_str(&mime_type)?),
            None => Ok(part),
        }
    }
}

/// Part sent for an image input that has no file selected: an empty file
/// with an empty filename, which the backend rejects with its own message.
pub(crate) fn empty_file_part() -> Result<Part, ClientError> {
    Ok(Part::bytes(Vec::new())
        .file_name(String::new())
        .mime_str("application/octet-stream")?)
}

/// Reads a local file and returns it as a data URL suitable for an image
/// source.
pub async fn read_as_data_url(path: impl Into<PathBuf>) -> Result<String, ClientError> {
    let path = path.into();
    let upload = ImageUpload::from_path(&path).await?;
    tracing::debug!(
        path = %path.display(),
        bytes = upload.bytes.len(),
        mime = upload.mime_type.as_deref().unwrap_or("unknown"),
        "read local image for preview"
    );
    Ok(upload.to_data_url())
}
