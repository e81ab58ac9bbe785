use indicatif::ProgressBar;
use std::time::Duration;

/// Spinner shown while a report file is being imported; hidden off-terminal
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stdout().is_term() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    /// Remove the spinner line so the caller's own output takes its place
    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}
