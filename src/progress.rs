//! Terminal progress display.

use crate::observe::{Observer, PipelineEvent, Stage};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Mirrors pipeline events onto a progress bar, then forwards them.
///
/// The bar starts as a spinner and switches to a batch counter once the
/// number of batches is known.
pub struct ProgressObserver<O> {
    inner: O,
    bar: ProgressBar,
}

impl<O: Observer> ProgressObserver<O> {
    pub fn new(inner: O) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { inner, bar }
    }

    /// Clear the bar from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn update(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageEntered(stage) => {
                let message = match stage {
                    Stage::Fetching => "Fetching post and comments...",
                    Stage::Normalizing => "Cleaning comments...",
                    Stage::Dispatching => "Analyzing batches...",
                    Stage::Merging => "Merging results...",
                    Stage::Done => "Done",
                    Stage::Failed => "Failed",
                };
                self.bar.set_message(message);
            }
            PipelineEvent::CommentsNormalized { batches, .. } => {
                self.bar.set_style(batch_style());
                self.bar.set_length(*batches as u64);
                self.bar.set_position(0);
            }
            PipelineEvent::BatchCompleted { .. } | PipelineEvent::BatchFailed { .. } => {
                self.bar.inc(1);
            }
            _ => {}
        }
    }
}

impl<O: Observer> Observer for ProgressObserver<O> {
    fn info(&self, event: &PipelineEvent) {
        self.update(event);
        self.bar.suspend(|| self.inner.info(event));
    }

    fn warn(&self, event: &PipelineEvent) {
        self.update(event);
        self.bar.suspend(|| self.inner.warn(event));
    }

    fn error(&self, event: &PipelineEvent) {
        self.update(event);
        self.bar.suspend(|| self.inner.error(event));
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn batch_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
