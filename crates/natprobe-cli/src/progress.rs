//! Spinner shown while a classification run is in flight.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Classification progress indicator
pub struct ProbeProgress {
    bar: ProgressBar,
}

impl ProbeProgress {
    /// Start a spinner for a run against `server`
    #[must_use]
    pub fn start(server: &str) -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")
        {
            bar.set_style(style);
        }

        bar.set_message(format!("Classifying NAT via {server}"));
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Hidden indicator for non-interactive output
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Stop and clear the spinner
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
