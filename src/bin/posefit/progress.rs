use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use posefit::{BatchReporter, BatchSummary, ItemReport, ItemStatus, WorkItem};
use std::sync::Mutex;

/// CLI progress reporter: one bar per batch, advanced as items finish.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl BatchReporter for CliReporter {
    fn on_batch_start(&self, stage: &str, total: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} {prefix} [{bar:30.cyan/dim}] {pos}/{len} {wide_msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_prefix(stage.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_item_start(&self, item: &WorkItem) {
        self.with_bar(|pb| pb.set_message(item.id.clone()));
    }

    fn on_item_finish(&self, report: &ItemReport) {
        let mark = match report.status {
            ItemStatus::Succeeded => "✓".green(),
            ItemStatus::SkippedComplete => "-".dimmed(),
            _ => "✗".red(),
        };
        self.with_bar(|pb| {
            pb.println(format!("  {} {}", mark, report.id));
            pb.inc(1);
        });
    }

    fn on_batch_complete(&self, _summary: &BatchSummary) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}
