use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("Invalid quality value: {0}. Must be greater than 0 and at most 1")]
    InvalidQuality(f32),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("No files found in input path: {0}")]
    NoFilesFound(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl UploadError {
    pub fn is_validation(&self) -> bool {
        matches!(self, UploadError::Validation(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            UploadError::Decode(_) | UploadError::ImageProcessing(_)
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, UploadError::Transport(_))
    }
}

/// Failure of a single network upload. Never fatal to the batch.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Upload failed with status {code}")]
    Status { code: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upload aborted")]
    Aborted,

    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, UploadError>;
