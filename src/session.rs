//! Per-batch state owned by the caller.
//!
//! A [`BatchSession`] carries the candidate file set, generated previews, the
//! upload task table and the cancellation token for one batch. Independent
//! batches use independent sessions; nothing is shared between them.

use crate::batch::{BatchOptions, BatchUploadManager, UploadOutcome};
use crate::error::{Result, UploadError};
use crate::file::FileHandle;
use crate::preview::{PreviewGenerator, PreviewResult};
use crate::utils::percent_of;
use crate::validation::{validate_batch, BatchPolicy, BatchValidation};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Callbacks the rendering layer subscribes to. Every method defaults to a
/// no-op so adapters only implement what they draw.
pub trait UploadObserver: Send + Sync {
    fn on_file_add(&self, _file: &FileHandle) {}

    fn on_file_remove(&self, _file_name: &str) {}

    fn on_file_progress(&self, _index: usize, _percent: f64) {}

    fn on_overall_progress(&self, _percent: f64, _completed: usize, _total: usize) {}

    fn on_file_complete(&self, _outcome: &UploadOutcome) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Uploading,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct UploadTask {
    pub index: usize,
    pub file: FileHandle,
    pub status: TaskStatus,
    pub progress_percent: f64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
}

impl BatchProgress {
    fn new(completed: usize, total: usize) -> Self {
        Self {
            completed,
            total,
            percent: percent_of(completed as u64, total as u64),
        }
    }
}

#[derive(Debug, Default)]
struct TaskTable {
    tasks: Vec<UploadTask>,
    completed: usize,
}

pub struct BatchSession {
    id: Uuid,
    observer: Arc<dyn UploadObserver>,
    cancel: CancellationToken,
    files: Vec<FileHandle>,
    /// Parallel to `files`, so same-named candidates keep separate previews.
    previews: Vec<Option<PreviewResult>>,
    table: Arc<Mutex<TaskTable>>,
}

/// Creates an empty session reporting to `observer`.
pub fn create_batch_session(observer: Arc<dyn UploadObserver>) -> BatchSession {
    BatchSession {
        id: Uuid::new_v4(),
        observer,
        cancel: CancellationToken::new(),
        files: Vec::new(),
        previews: Vec::new(),
        table: Arc::new(Mutex::new(TaskTable::default())),
    }
}

fn lock(table: &Mutex<TaskTable>) -> MutexGuard<'_, TaskTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl BatchSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn observer(&self) -> &Arc<dyn UploadObserver> {
        &self.observer
    }

    /// Token shared with every in-flight operation of this session. Clone it
    /// to cancel from another task while a batch is running.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        tracing::info!(session = %self.id, "Cancelling batch");
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn files(&self) -> &[FileHandle] {
        &self.files
    }

    pub fn add_file(&mut self, file: FileHandle) {
        self.observer.on_file_add(&file);
        self.files.push(file);
        self.previews.push(None);
    }

    /// Removes the first file called `file_name` and discards its preview.
    pub fn remove_file(&mut self, file_name: &str) -> Option<FileHandle> {
        let position = self.files.iter().position(|f| f.name() == file_name)?;
        let removed = self.files.remove(position);
        self.previews.remove(position);
        self.observer.on_file_remove(file_name);
        Some(removed)
    }

    /// Preview of the candidate at `index` in [`files`](Self::files).
    pub fn preview(&self, index: usize) -> Option<&PreviewResult> {
        self.previews.get(index).and_then(Option::as_ref)
    }

    /// Generates previews for every candidate that does not have one yet.
    ///
    /// Returns the files whose preview failed; they stay in the candidate set.
    pub async fn generate_previews(
        &mut self,
        generator: &PreviewGenerator,
    ) -> Vec<(String, UploadError)> {
        let mut failures = Vec::new();

        for (file, slot) in self.files.iter().zip(self.previews.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            match generator.generate_preview(file, &self.cancel).await {
                Ok(preview) => {
                    *slot = Some(preview);
                }
                Err(e) => {
                    tracing::warn!(file = %file.name(), error = %e, "Preview generation failed");
                    failures.push((file.name().to_string(), e));
                }
            }
        }

        failures
    }

    pub fn validate(&self, policy: &BatchPolicy) -> BatchValidation {
        validate_batch(&self.files, policy)
    }

    /// Validates the candidate set and uploads the accepted files.
    ///
    /// Fails with every validation error before any network activity when the
    /// batch is not valid.
    pub async fn submit(
        &self,
        manager: &BatchUploadManager,
        endpoint: &str,
        policy: &BatchPolicy,
        options: &BatchOptions,
    ) -> Result<Vec<UploadOutcome>> {
        let validation = self.validate(policy);
        if !validation.valid {
            return Err(UploadError::Validation(validation.errors));
        }

        Ok(manager
            .upload_batch(self, &validation.valid_files, endpoint, options)
            .await)
    }

    pub fn tasks(&self) -> Vec<UploadTask> {
        lock(&self.table).tasks.clone()
    }

    pub fn progress(&self) -> BatchProgress {
        let table = lock(&self.table);
        BatchProgress::new(table.completed, table.tasks.len())
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        lock(&self.table)
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Failed)
            .map(|task| task.index)
            .collect()
    }

    /// Files whose last upload failed, in their original order, for a retry.
    pub fn failed_files(&self) -> Vec<FileHandle> {
        lock(&self.table)
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Failed)
            .map(|task| task.file.clone())
            .collect()
    }

    /// Drops candidates, previews and tasks, and arms a fresh cancellation
    /// token.
    pub fn clear(&mut self) {
        self.files.clear();
        self.previews.clear();
        *lock(&self.table) = TaskTable::default();
        self.cancel = CancellationToken::new();
    }

    pub(crate) fn begin_batch(&self, files: &[FileHandle]) {
        let mut table = lock(&self.table);
        table.completed = 0;
        table.tasks = files
            .iter()
            .enumerate()
            .map(|(index, file)| UploadTask {
                index,
                file: file.clone(),
                status: TaskStatus::Pending,
                progress_percent: 0.0,
                error: None,
            })
            .collect();
    }

    pub(crate) fn mark_uploading(&self, index: usize) {
        if let Some(task) = lock(&self.table).tasks.get_mut(index) {
            task.status = TaskStatus::Uploading;
        }
    }

    /// Callback recording per-file progress and forwarding it to the observer.
    pub(crate) fn progress_callback(&self, index: usize) -> Arc<dyn Fn(f64) + Send + Sync> {
        let table = self.table.clone();
        let observer = self.observer.clone();
        Arc::new(move |percent| {
            if let Some(task) = lock(&table).tasks.get_mut(index) {
                task.progress_percent = percent;
            }
            observer.on_file_progress(index, percent);
        })
    }

    /// Records a terminal transition and returns the updated aggregate.
    pub(crate) fn complete_task(&self, outcome: &UploadOutcome) -> BatchProgress {
        let mut table = lock(&self.table);
        if let Some(task) = table.tasks.get_mut(outcome.index) {
            match &outcome.result {
                Ok(_) => {
                    task.status = TaskStatus::Succeeded;
                    task.progress_percent = 100.0;
                }
                Err(e) => {
                    task.status = TaskStatus::Failed;
                    task.error = Some(e.to_string());
                }
            }
        }
        table.completed += 1;
        BatchProgress::new(table.completed, table.tasks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::ServerResponse;

    #[derive(Default)]
    struct Recorder {
        added: Mutex<Vec<String>>,
        removed: Mutex<Vec<String>>,
    }

    impl UploadObserver for Recorder {
        fn on_file_add(&self, file: &FileHandle) {
            self.added.lock().unwrap().push(file.name().to_string());
        }

        fn on_file_remove(&self, file_name: &str) {
            self.removed.lock().unwrap().push(file_name.to_string());
        }
    }

    fn file(name: &str) -> FileHandle {
        FileHandle::new(name, "application/pdf", vec![0u8; 4])
    }

    #[test]
    fn test_sessions_are_independent() {
        let first = create_batch_session(Arc::new(NoopObserver));
        let second = create_batch_session(Arc::new(NoopObserver));
        assert_ne!(first.id(), second.id());

        first.cancel();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[tokio::test]
    async fn test_add_and_remove_notify_observer_and_drop_preview() {
        let recorder = Arc::new(Recorder::default());
        let mut session = create_batch_session(recorder.clone());

        session.add_file(file("a.pdf"));
        session.add_file(file("b.pdf"));
        let failures = session.generate_previews(&PreviewGenerator::default()).await;
        assert!(failures.is_empty());
        assert!(session.preview(0).is_some());

        let removed = session.remove_file("a.pdf").unwrap();
        assert_eq!(removed.name(), "a.pdf");
        assert_eq!(session.files()[0].name(), "b.pdf");
        assert!(session.preview(0).is_some());
        assert!(session.preview(1).is_none());
        assert!(session.remove_file("missing.pdf").is_none());

        assert_eq!(*recorder.added.lock().unwrap(), vec!["a.pdf", "b.pdf"]);
        assert_eq!(*recorder.removed.lock().unwrap(), vec!["a.pdf"]);
        assert_eq!(session.files().len(), 1);
    }

    #[test]
    fn test_task_lifecycle() {
        let session = create_batch_session(Arc::new(NoopObserver));
        session.begin_batch(&[file("a.pdf"), file("b.pdf")]);
        assert!(session.tasks().iter().all(|t| t.status == TaskStatus::Pending));

        session.mark_uploading(0);
        (session.progress_callback(0))(40.0);
        let task = &session.tasks()[0];
        assert_eq!(task.status, TaskStatus::Uploading);
        assert_eq!(task.progress_percent, 40.0);

        let progress = session.complete_task(&UploadOutcome {
            index: 0,
            file_name: "a.pdf".to_string(),
            result: Ok(ServerResponse::Text("ok".to_string())),
        });
        assert_eq!(progress, BatchProgress { completed: 1, total: 2, percent: 50.0 });

        let progress = session.complete_task(&UploadOutcome {
            index: 1,
            file_name: "b.pdf".to_string(),
            result: Err(UploadError::Decode("bad".to_string())),
        });
        assert_eq!(progress.percent, 100.0);
        assert!(session.tasks().iter().all(|t| t.status.is_terminal()));

        assert_eq!(session.failed_indices(), vec![1]);
        let failed = session.failed_files();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name(), "b.pdf");
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut session = create_batch_session(Arc::new(NoopObserver));
        session.add_file(file("a.pdf"));
        session.begin_batch(session.files().to_vec().as_slice());
        session.cancel();

        session.clear();

        assert!(session.files().is_empty());
        assert!(session.tasks().is_empty());
        assert!(!session.is_cancelled());
        assert_eq!(session.progress().total, 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_before_upload() {
        let mut session = create_batch_session(Arc::new(NoopObserver));
        session.add_file(FileHandle::new("a.zip", "application/zip", vec![1u8]));

        let result = session
            .submit(
                &BatchUploadManager::http(),
                "http://127.0.0.1:9/upload",
                &BatchPolicy::default(),
                &BatchOptions::default(),
            )
            .await;

        match result {
            Err(UploadError::Validation(errors)) => {
                assert_eq!(errors, vec!["a.zip: File type application/zip is not supported"]);
            }
            other => panic!("unexpected result {:?}", other.map(|o| o.len())),
        }
        assert!(session.tasks().is_empty());
    }
    #[tokio::test]
    async fn test_same_named_candidates_keep_their_own_previews() {
        let mut session = create_batch_session(Arc::new(NoopObserver));
        session.add_file(FileHandle::new("report", "application/pdf", vec![1u8]));
        session.add_file(FileHandle::new("report", "audio/mpeg", vec![2u8]));

        session.generate_previews(&PreviewGenerator::default()).await;
        assert_eq!(
            session.preview(0),
            Some(&PreviewResult::Other { icon: "file-text".to_string() })
        );
        assert_eq!(
            session.preview(1),
            Some(&PreviewResult::Other { icon: "music".to_string() })
        );

        session.remove_file("report");
        assert_eq!(session.files()[0].mime_type(), "audio/mpeg");
        assert_eq!(
            session.preview(0),
            Some(&PreviewResult::Other { icon: "music".to_string() })
        );
    }
}
