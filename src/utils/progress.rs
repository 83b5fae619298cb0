use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

const RUNNING_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg:>40}";
const DONE_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg:>40}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// One progress bar per pipeline stage. Without a `MultiProgress` every call is a no-op.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: Option<ProgressBar>,
    stage: String,
}

impl ProgressTracker {
    pub fn new(multi_progress: Option<&Arc<MultiProgress>>, stage: &str) -> Self {
        let progress_bar = multi_progress.map(|mp| {
            let pb = mp.add(ProgressBar::new(0));
            pb.set_style(style(RUNNING_TEMPLATE));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self {
            progress_bar,
            stage: stage.to_string(),
        }
    }

    pub fn hidden(stage: &str) -> Self {
        Self::new(None, stage)
    }

    pub fn start_progress(&self, total: u64) {
        if let Some(pb) = &self.progress_bar {
            pb.reset();
            pb.set_length(total);
            pb.set_position(0);
            pb.set_message(self.stage.clone());
        }
    }

    pub fn update_message(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("{} [{}]", self.stage, message));
        }
    }

    pub fn increment(&self, delta: u64) {
        if let Some(pb) = &self.progress_bar {
            pb.inc(delta);
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.set_style(style(DONE_TEMPLATE));
            pb.finish_with_message(format!("{} complete", self.stage));
        }
    }

    pub fn position(&self) -> u64 {
        self.progress_bar.as_ref().map_or(0, |pb| pb.position())
    }
}
