use crate::batch::UploadOutcome;
use crate::constants::{OVERALL_BAR_TEMPLATE, PROGRESS_BAR_TEMPLATE};
use crate::file::FileHandle;
use crate::session::UploadObserver;
use crate::utils::format_file_size;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Mutex, MutexGuard};

/// Terminal progress display: one bar per file plus an overall bar.
pub struct ProgressRenderer {
    multi: MultiProgress,
    overall: ProgressBar,
    bars: Mutex<Vec<(String, ProgressBar)>>,
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let overall = multi.add(ProgressBar::new(0));
        overall.set_style(style(OVERALL_BAR_TEMPLATE));

        Self {
            multi,
            overall,
            bars: Mutex::new(Vec::new()),
        }
    }

    fn bars(&self) -> MutexGuard<'_, Vec<(String, ProgressBar)>> {
        self.bars.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bar(&self, index: usize) -> Option<ProgressBar> {
        self.bars().get(index).map(|(_, bar)| bar.clone())
    }

    pub fn len(&self) -> usize {
        self.bars().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn finish(&self) {
        for (_, bar) in self.bars().iter() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
        self.overall.finish();
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadObserver for ProgressRenderer {
    fn on_file_add(&self, file: &FileHandle) {
        let mut bars = self.bars();
        let bar = self.multi.insert_before(&self.overall, ProgressBar::new(100));
        bar.set_style(style(PROGRESS_BAR_TEMPLATE));
        bar.set_prefix(format!("{}", bars.len() + 1));
        bar.set_message(format!("{} ({})", file.name(), format_file_size(file.size_bytes())));
        bars.push((file.name().to_string(), bar));
    }

    fn on_file_remove(&self, file_name: &str) {
        let mut bars = self.bars();
        if let Some(position) = bars.iter().position(|(name, _)| name == file_name) {
            let (_, bar) = bars.remove(position);
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }

    fn on_file_progress(&self, index: usize, percent: f64) {
        if let Some(bar) = self.bar(index) {
            bar.set_position(percent.round().clamp(0.0, 100.0) as u64);
        }
    }

    fn on_overall_progress(&self, _percent: f64, completed: usize, total: usize) {
        self.overall.set_length(total as u64);
        self.overall.set_position(completed as u64);
    }

    fn on_file_complete(&self, outcome: &UploadOutcome) {
        let Some(bar) = self.bar(outcome.index) else {
            return;
        };
        match &outcome.result {
            Ok(_) => bar.finish_with_message(format!("{} done", outcome.file_name)),
            Err(e) => bar.abandon_with_message(format!("{} failed: {}", outcome.file_name, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;

    fn file(name: &str) -> FileHandle {
        FileHandle::new(name, "text/plain", vec![b'x'; 10])
    }

    #[test]
    fn test_bars_follow_file_set() {
        let renderer = ProgressRenderer::hidden();
        renderer.on_file_add(&file("a.txt"));
        renderer.on_file_add(&file("b.txt"));
        assert_eq!(renderer.len(), 2);

        renderer.on_file_remove("a.txt");
        renderer.on_file_remove("missing.txt");
        assert_eq!(renderer.len(), 1);
    }

    #[test]
    fn test_progress_and_completion() {
        let renderer = ProgressRenderer::hidden();
        renderer.on_file_add(&file("a.txt"));

        renderer.on_file_progress(0, 42.4);
        assert_eq!(renderer.bar(0).unwrap().position(), 42);

        renderer.on_file_progress(7, 10.0);
        renderer.on_overall_progress(50.0, 1, 2);
        assert_eq!(renderer.overall.position(), 1);
        assert_eq!(renderer.overall.length(), Some(2));

        renderer.on_file_complete(&UploadOutcome {
            index: 0,
            file_name: "a.txt".to_string(),
            result: Err(UploadError::Decode("bad".to_string())),
        });
        assert!(renderer.bar(0).unwrap().is_finished());
        renderer.finish();
        assert!(renderer.overall.is_finished());
    }
}
