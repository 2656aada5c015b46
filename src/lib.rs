pub mod batch;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod file;
pub mod formats;
pub mod logger;
pub mod preview;
pub mod processing;
pub mod render;
pub mod session;
pub mod upload;
pub mod utils;
pub mod validation;

pub use batch::{BatchOptions, BatchUploadManager, UploadOutcome};
pub use config::UploadConfig;
pub use error::{Result, TransportError, UploadError};
pub use file::{FileCategory, FileHandle};
pub use formats::OutputFormat;
pub use preview::{FfmpegFrameExtractor, FrameExtractor, PreviewGenerator, PreviewResult};
pub use processing::{compress_bytes, compress_image, fit_within, CompressionOptions};
pub use render::ProgressRenderer;
pub use session::{
    create_batch_session, BatchProgress, BatchSession, NoopObserver, TaskStatus, UploadObserver,
    UploadTask,
};
pub use upload::{HttpMethod, HttpTransport, ServerResponse, Transport, TransportOptions};
pub use validation::{
    validate_batch, validate_size, validate_type, BatchPolicy, BatchValidation, ValidationResult,
};
