use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives progress updates from the importer.
pub trait ImportProgress: Send + Sync {
    /// A new phase starts; `total` is the number of units it will advance by.
    fn on_phase(&self, message: &str, total: u64);

    fn on_advance(&self, delta: u64);

    fn on_complete(&self, message: &str);
}

/// Discards all updates.
pub struct SilentProgress;

impl ImportProgress for SilentProgress {
    fn on_phase(&self, _message: &str, _total: u64) {}
    fn on_advance(&self, _delta: u64) {}
    fn on_complete(&self, _message: &str) {}
}

/// One terminal progress bar per phase.
pub struct BarProgress {
    current: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl BarProgress {
    pub fn new(hidden: bool) -> Self {
        Self { current: Mutex::new(None), hidden }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            " {pos}/{len} [{bar:40}] {percent:>3}% {elapsed_precise}/{eta_precise} -- {msg}",
        )
        .expect("static pattern")
        .progress_chars("=> ")
    }
}

impl ImportProgress for BarProgress {
    fn on_phase(&self, message: &str, total: u64) {
        let bar = ProgressBar::new(total);
        if self.hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_style(Self::style());
        bar.set_message(message.to_string());

        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.replace(bar) {
            previous.finish();
        }
    }

    fn on_advance(&self, delta: u64) {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = current.as_ref() {
            bar.inc(delta);
        }
    }

    fn on_complete(&self, message: &str) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = current.take() {
            bar.finish();
        }
        if !self.hidden {
            println!("{message}");
        }
    }
}
