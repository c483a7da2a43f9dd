use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// A single rolling status line shown in terse mode
pub trait StatusLine: Send + Sync {
    fn start(&self, message: &str);
    fn update(&self, message: &str);
    /// Clear the line. Calling it when nothing is shown does nothing.
    fn stop(&self);
    fn is_active(&self) -> bool;
}

/// Spinner status line drawn on stderr
#[derive(Default)]
pub struct SpinnerStatus {
    bar: Mutex<Option<ProgressBar>>,
}

impl SpinnerStatus {
    pub fn new() -> Self {
        Self::default()
    }

    fn spinner(message: &str) -> ProgressBar {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StatusLine for SpinnerStatus {
    fn start(&self, message: &str) {
        let mut slot = self.slot();
        match slot.as_ref() {
            Some(bar) => bar.set_message(message.to_string()),
            None => *slot = Some(Self::spinner(message)),
        }
    }

    fn update(&self, message: &str) {
        match self.slot().as_ref() {
            Some(bar) => bar.set_message(message.to_string()),
            None => tracing::debug!("Status update while stopped: {}", message),
        }
    }

    fn stop(&self) {
        if let Some(bar) = self.slot().take() {
            bar.finish_and_clear();
        }
    }

    fn is_active(&self) -> bool {
        self.slot().is_some()
    }
}

impl Drop for SpinnerStatus {
    fn drop(&mut self) {
        self.stop();
    }
}
