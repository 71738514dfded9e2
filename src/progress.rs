//! Terminal progress for concurrent fetches.

use crate::aggregate::Observer;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

/// Observer that ticks a progress bar as each request settles.
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    /// A bar sized for `total` requests. With `hidden` nothing is drawn,
    /// but failures are still logged.
    pub fn new(total: usize, label: &str, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };
        bar.set_length(total as u64);

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_prefix(label.to_string());

        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Observer for ProgressObserver {
    fn on_failure(&self, id: &str, error: &anyhow::Error) {
        self.bar
            .suspend(|| warn!("{} failed, using fallback: {:#}", id, error));
    }

    fn on_settled(&self, id: &str, _succeeded: bool) {
        self.bar.set_message(id.to_string());
        self.bar.inc(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_once_per_settled_task() {
        let observer = ProgressObserver::new(3, "Weather", true);

        observer.on_settled("Kampala", true);
        observer.on_failure("Gulu", &anyhow::anyhow!("HTTP 500"));
        observer.on_settled("Gulu", false);

        assert_eq!(observer.bar.position(), 2);
        assert_eq!(observer.bar.length(), Some(3));
        observer.finish();
    }
}
