//! # Progress Feedback Module
//!
//! Spinner su stderr durante la modalità batch ("Minifying images").
//! `indicatif` lo nasconde automaticamente quando stderr non è un terminale,
//! quindi pipe e test non vedono caratteri di controllo.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a batch runs
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    /// Create and start a spinner with a message
    pub fn start(message: &str, total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{pos}/{len}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A spinner that never draws
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn handle(&self) -> ProgressBar {
        self.bar.clone()
    }

    /// Remove the spinner before the summary is printed
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
