use std::time::{Duration, Instant};
use indicatif::{ProgressBar, ProgressStyle};
use console::style;
use crate::pipeline::ReportEvent;

/// Progress bar over the applications of one report run.
pub struct FetchProgress {
    bar: ProgressBar,
    rows: usize,
    skipped: usize,
    start_time: Instant,
}

impl FetchProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("Listing applications...");
        bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            bar,
            rows: 0,
            skipped: 0,
            start_time: Instant::now(),
        }
    }

    pub fn handle_event(&mut self, event: &ReportEvent) {
        match event {
            ReportEvent::ApplicationsListed { count } => {
                self.bar.set_length(*count as u64);
                self.bar.set_position(0);
                self.bar.set_style(
                    ProgressStyle::default_bar()
                        .template("  {bar:30.cyan/dark_gray} {pos}/{len} applications | {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░"),
                );
                self.update_message();
            }
            ReportEvent::ApplicationCompleted { rows, .. } => {
                self.rows += rows;
                self.bar.inc(1);
                self.update_message();
            }
            ReportEvent::ApplicationSkipped { .. } => {
                self.skipped += 1;
                self.bar.inc(1);
                self.update_message();
            }
            ReportEvent::ReportWritten { rows, .. } => {
                self.bar.finish_with_message(format!(
                    "{} {} rows in {}",
                    style("✓").green(),
                    rows,
                    format_elapsed(self.start_time.elapsed().as_millis() as u64),
                ));
            }
            ReportEvent::ReportFailed { error } => {
                self.bar.abandon_with_message(format!("{} {}", style("✗").red(), error));
            }
        }
    }

    fn update_message(&self) {
        self.bar.set_message(format!(
            "{} rows | {} skipped | {}",
            self.rows,
            self.skipped,
            format_elapsed(self.start_time.elapsed().as_millis() as u64),
        ));
    }
}

impl Default for FetchProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn format_elapsed(ms: u64) -> String {
    let secs = ms / 1000;
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    if mins > 0 {
        format!("{}m{}s", mins, remaining_secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(999), "0s");
        assert_eq!(format_elapsed(42_000), "42s");
        assert_eq!(format_elapsed(125_000), "2m5s");
    }

    #[test]
    fn test_counts_rows_and_skips() {
        let mut progress = FetchProgress::new();
        progress.handle_event(&ReportEvent::ApplicationsListed { count: 3 });
        progress.handle_event(&ReportEvent::ApplicationCompleted { public_id: "a".into(), rows: 4 });
        progress.handle_event(&ReportEvent::ApplicationSkipped { public_id: "b".into() });
        progress.handle_event(&ReportEvent::ApplicationCompleted { public_id: "c".into(), rows: 1 });
        assert_eq!(progress.rows, 5);
        assert_eq!(progress.skipped, 1);
        assert_eq!(progress.bar.position(), 3);
        progress.handle_event(&ReportEvent::ReportWritten { path: "r.csv".into(), rows: 5 });
        assert!(progress.bar.is_finished());
    }
}
