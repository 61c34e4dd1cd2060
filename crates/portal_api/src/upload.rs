use std::path::Path;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};

use crate::error::ApiError;

/// Which analysis endpoint a file is headed for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UploadKind {
    /// FRA claim forms: scans or PDFs.
    Document,
    /// Satellite or drone imagery for segmentation and asset detection.
    Imagery,
}

impl UploadKind {
    pub fn accepts(self, content_type: &str) -> bool {
        let is_image = content_type.starts_with("image/");
        match self {
            UploadKind::Document => is_image || content_type == "application/pdf",
            UploadKind::Imagery => is_image,
        }
    }

    pub fn check(self, file: &UploadFile) -> Result<(), ApiError> {
        if self.accepts(&file.content_type) {
            Ok(())
        } else {
            Err(ApiError::InvalidInput(format!(
                "{}: unsupported file type {}",
                file.filename, file.content_type
            )))
        }
    }
}

/// A file held in memory, ready for a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub filename: String,
    /// Guessed from the extension.
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            filename,
            content_type,
            bytes: bytes.into(),
        }
    }

    pub async fn read(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::InvalidInput(format!("cannot read {}: {e}", path.display())))?;
        Ok(Self::new(display_name(path), data))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Single-field multipart form carrying this file.
    pub(crate) fn into_form(self, field: &'static str) -> Result<Form, ApiError> {
        let part = Part::bytes(self.bytes.to_vec())
            .file_name(self.filename)
            .mime_str(&self.content_type)?;
        Ok(Form::new().part(field, part))
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
