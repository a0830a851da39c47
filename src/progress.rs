//! Progress display for a conversion run
//!
//! One spinner for the whole crawl, showing the package last started and
//! running totals. Hidden in quiet and JSON mode.

use crate::domain::RunSummary;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner tracking a crawl
pub struct CrawlProgress {
    bar: Option<ProgressBar>,
}

/// Totals shown next to the spinner
pub fn status_line(summary: &RunSummary, queued: usize, running: usize) -> String {
    let mut parts = vec![format!("{} converted", summary.converted_count())];
    if summary.failed_count() > 0 {
        parts.push(format!("{} failed", summary.failed_count()));
    }
    if summary.skipped_count() > 0 {
        parts.push(format!("{} skipped", summary.skipped_count()));
    }
    parts.push(format!("{} running, {} queued", running, queued));
    parts.join(", ")
}

impl CrawlProgress {
    /// Starts the spinner for a crawl rooted at `root`, unless disabled
    pub fn new(enabled: bool, root: &str) -> Self {
        if !enabled {
            return Self::hidden();
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {prefix:.bold} {msg}")
                .expect("Invalid template"),
        );
        bar.set_prefix(root.to_string());
        bar.set_message("fetching");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar: Some(bar) }
    }

    pub fn hidden() -> Self {
        Self { bar: None }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    /// Shows the package a pipeline was just started for
    pub fn converting(&self, package: &str) {
        if let Some(bar) = &self.bar {
            bar.set_prefix(package.to_string());
        }
    }

    /// Refreshes the totals after a package finished
    pub fn update(&self, summary: &RunSummary, queued: usize, running: usize) {
        if let Some(bar) = &self.bar {
            bar.set_message(status_line(summary, queued, running));
        }
    }

    /// Removes the spinner from the terminal
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for CrawlProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PackageOutcome, SkipReason};

    #[test]
    fn test_hidden_progress_ignores_updates() {
        let mut progress = CrawlProgress::new(false, "requests");
        assert!(!progress.is_visible());
        progress.converting("idna");
        progress.update(&RunSummary::new("requests", false), 1, 1);
        progress.finish();
        assert!(!progress.is_visible());
    }

    #[test]
    fn test_visible_progress_finishes() {
        let mut progress = CrawlProgress::new(true, "requests");
        assert!(progress.is_visible());
        progress.converting("urllib3");
        progress.finish();
        assert!(!progress.is_visible());
    }

    #[test]
    fn test_status_line() {
        let mut summary = RunSummary::new("requests", false);
        assert_eq!(status_line(&summary, 0, 1), "0 converted, 1 running, 0 queued");

        summary.record(PackageOutcome::Converted {
            name: "requests".to_string(),
            spack_name: "py-requests".to_string(),
            versions: 2,
            clauses: 4,
            depth: 0,
            warnings: vec![],
        });
        summary.record(PackageOutcome::Skipped {
            name: "idna".to_string(),
            reason: SkipReason::BudgetExhausted,
            requested_by: "requests".to_string(),
        });
        assert_eq!(
            status_line(&summary, 2, 3),
            "1 converted, 1 skipped, 3 running, 2 queued"
        );
    }
}
