use crate::constants::DEFAULT_CONCURRENCY;
use crate::error::{Result, TransportError, UploadError};
use crate::file::FileHandle;
use crate::processing::{compress_image, should_compress, CompressionOptions};
use crate::session::BatchSession;
use crate::upload::{HttpTransport, ProgressFn, ServerResponse, Transport, TransportOptions};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Uploads in flight at once. Zero is treated as one.
    pub concurrency: usize,
    /// Re-encode eligible images before sending them.
    pub compression: Option<CompressionOptions>,
    pub transport: TransportOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            compression: None,
            transport: TransportOptions::default(),
        }
    }
}

/// Terminal result of one file, tagged with its position in the input.
#[derive(Debug)]
pub struct UploadOutcome {
    pub index: usize,
    pub file_name: String,
    pub result: Result<ServerResponse>,
}

impl UploadOutcome {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&UploadError> {
        self.result.as_ref().err()
    }
}

/// Drives a batch of uploads through a [`Transport`] in bounded chunks.
#[derive(Clone)]
pub struct BatchUploadManager {
    transport: Arc<dyn Transport>,
}

impl BatchUploadManager {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn http() -> Self {
        Self::new(Arc::new(HttpTransport::new()))
    }

    /// Uploads `files` to `endpoint`, at most `options.concurrency` at a time.
    ///
    /// Files are split into consecutive chunks; a chunk finishes completely
    /// before the next one starts. Individual failures never abort the batch.
    /// The returned outcomes are ordered by input index, one per file.
    pub async fn upload_batch(
        &self,
        session: &BatchSession,
        files: &[FileHandle],
        endpoint: &str,
        options: &BatchOptions,
    ) -> Vec<UploadOutcome> {
        let total = files.len();
        let concurrency = options.concurrency.max(1);
        let start_time = Instant::now();

        tracing::info!(
            session = %session.id(),
            endpoint,
            total,
            concurrency,
            "Starting batch upload"
        );

        session.begin_batch(files);
        let mut outcomes = Vec::with_capacity(total);

        for (chunk_index, chunk) in files.chunks(concurrency).enumerate() {
            let base = chunk_index * concurrency;
            let uploads = chunk.iter().enumerate().map(|(offset, file)| {
                self.upload_one(session, base + offset, file, endpoint, options)
            });
            outcomes.extend(join_all(uploads).await);
        }

        outcomes.sort_by_key(|outcome| outcome.index);

        let succeeded = outcomes.iter().filter(|o| o.success()).count();
        tracing::info!(
            session = %session.id(),
            succeeded,
            failed = total - succeeded,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Batch upload finished"
        );

        outcomes
    }

    async fn upload_one(
        &self,
        session: &BatchSession,
        index: usize,
        file: &FileHandle,
        endpoint: &str,
        options: &BatchOptions,
    ) -> UploadOutcome {
        let result = if session.is_cancelled() {
            Err(TransportError::Aborted.into())
        } else {
            session.mark_uploading(index);
            self.send(session, index, file, endpoint, options)
                .await
                .map_err(|e| match e {
                    UploadError::Cancelled => TransportError::Aborted.into(),
                    other => other,
                })
        };

        if let Err(e) = &result {
            tracing::warn!(index, file = %file.name(), error = %e, "Upload failed");
        } else {
            tracing::debug!(index, file = %file.name(), "Upload succeeded");
        }

        let outcome = UploadOutcome {
            index,
            file_name: file.name().to_string(),
            result,
        };

        let progress = session.complete_task(&outcome);
        let observer = session.observer();
        observer.on_file_complete(&outcome);
        observer.on_overall_progress(progress.percent, progress.completed, progress.total);

        outcome
    }

    async fn send(
        &self,
        session: &BatchSession,
        index: usize,
        file: &FileHandle,
        endpoint: &str,
        options: &BatchOptions,
    ) -> Result<ServerResponse> {
        let cancel = session.cancellation_token();

        let payload = match &options.compression {
            Some(compression) if should_compress(file) => {
                compress_image(file, compression, cancel).await?
            }
            _ => file.clone(),
        };

        let report = session.progress_callback(index);
        let on_progress: ProgressFn = Arc::new(move |percent, _sent, _total| report(percent));

        let response = self
            .transport
            .upload(&payload, endpoint, &options.transport, on_progress, cancel)
            .await?;

        Ok(response)
    }
}
