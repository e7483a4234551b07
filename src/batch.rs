use crate::completion::{self, OutputDescriptor};
use crate::discovery::{ItemStatus, WorkItem};
use crate::error::{Error, ItemError};
use crate::invoker::{ToolInvocation, ToolRunner};
use crate::listing::Listing;
use crate::progress::{BatchReporter, SilentReporter};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// What a stage wants done for one item once its prerequisites check out.
#[derive(Debug)]
pub enum Step {
    /// Run an external tool; success means exit code 0.
    Invoke(ToolInvocation),
    /// The stage already did its work locally. Stages without an external
    /// tool (flattening) do their work in `prepare` and return this.
    Done,
}

/// One pipeline stage as seen by the batch driver.
///
/// The driver never looks at a tool's argument shape: a stage discovers its
/// items, names the outputs that mark an item as done, and turns an item
/// into a `Step`.
pub trait Stage {
    fn name(&self) -> &str;

    /// Directory the stage discovers work under, for diagnostics.
    fn work_root(&self) -> &Path;

    fn discover(&self, listing: &dyn Listing) -> Result<Vec<WorkItem>, Error>;

    fn expected_outputs(&self, item: &WorkItem) -> Vec<OutputDescriptor>;

    /// Check prerequisites, create output folders and build the step.
    fn prepare(&self, item: &WorkItem, listing: &dyn Listing) -> Result<Step, ItemError>;
}

#[derive(Debug)]
pub struct ItemReport {
    pub id: String,
    pub status: ItemStatus,
    pub error: Option<ItemError>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub stage: String,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
    pub duration: Duration,
    pub items: Vec<ItemReport>,
}

impl BatchSummary {
    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|r| r.status == ItemStatus::Failed)
    }

    fn record(&mut self, report: ItemReport) {
        match report.status {
            ItemStatus::Succeeded => self.succeeded += 1,
            ItemStatus::SkippedComplete => self.skipped += 1,
            ItemStatus::Failed => self.failed += 1,
            ItemStatus::Pending | ItemStatus::Running => {}
        }
        self.total += 1;
        self.items.push(report);
    }
}

/// Sequential per-item driver shared by every stage.
///
/// Items run one at a time, in discovery order. A failing item is recorded
/// and the batch moves on; only configuration problems and an empty
/// discovery abort a run.
pub struct BatchDriver<'a> {
    runner: &'a dyn ToolRunner,
    listing: &'a dyn Listing,
    reporter: &'a dyn BatchReporter,
    force: bool,
}

impl<'a> BatchDriver<'a> {
    pub fn new(runner: &'a dyn ToolRunner, listing: &'a dyn Listing) -> Self {
        Self {
            runner,
            listing,
            reporter: &SilentReporter,
            force: false,
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn BatchReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run every item even when its outputs are already present.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn run(&self, stage: &dyn Stage) -> Result<BatchSummary, Error> {
        let start = Instant::now();

        info!("[{}] Discovering work under {}", stage.name(), stage.work_root().display());
        let items = stage.discover(self.listing)?;
        if items.is_empty() {
            return Err(Error::NoWorkItems {
                stage: stage.name().to_string(),
                root: stage.work_root().to_path_buf(),
            });
        }
        info!("[{}] {} item(s) to consider", stage.name(), items.len());
        self.reporter.on_batch_start(stage.name(), items.len());

        let mut summary = BatchSummary {
            stage: stage.name().to_string(),
            ..Default::default()
        };

        for mut item in items {
            item.outputs = stage.expected_outputs(&item);
            let report = self.process_item(stage, &mut item);
            self.reporter.on_item_finish(&report);
            summary.record(report);
        }

        summary.duration = start.elapsed();
        info!(
            "[{}] {} succeeded, {} skipped, {} failed, {} total in {:.2}s",
            summary.stage,
            summary.succeeded,
            summary.skipped,
            summary.failed,
            summary.total,
            summary.duration.as_secs_f64(),
        );
        self.reporter.on_batch_complete(&summary);
        Ok(summary)
    }

    fn process_item(&self, stage: &dyn Stage, item: &mut WorkItem) -> ItemReport {
        if !self.force && completion::is_complete(item, self.listing) {
            item.status = ItemStatus::SkippedComplete;
            info!("[skip] {} (outputs exist)", item.id);
            return ItemReport {
                id: item.id.clone(),
                status: item.status,
                error: None,
            };
        }

        item.status = ItemStatus::Running;
        self.reporter.on_item_start(item);
        info!("[run] {}", item.id);

        let error = match self.execute(stage, item) {
            Ok(()) => {
                item.status = ItemStatus::Succeeded;
                debug!("[ok] {}", item.id);
                None
            }
            Err(err) => {
                item.status = ItemStatus::Failed;
                log_failure(&item.id, &err);
                Some(err)
            }
        };

        ItemReport {
            id: item.id.clone(),
            status: item.status,
            error,
        }
    }

    fn execute(&self, stage: &dyn Stage, item: &WorkItem) -> Result<(), ItemError> {
        match stage.prepare(item, self.listing)? {
            Step::Invoke(invocation) => {
                debug!("[{}] {}", item.id, invocation.command_line());
                self.runner.run(&invocation)?.into_result()?;
                Ok(())
            }
            Step::Done => Ok(()),
        }
    }
}

fn log_failure(id: &str, err: &ItemError) {
    error!("[fail] {}: {}", id, err);
    if let ItemError::ToolFailed { stdout, stderr, .. } = err {
        if !stderr.trim().is_empty() {
            error!("[fail] {} stderr:\n{}", id, tail(stderr, 40));
        }
        debug!("[fail] {} stdout:\n{}", id, stdout);
    }
}

/// Last `lines` lines of `text`.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let skip = all.len().saturating_sub(lines);
    all[skip..].join("\n")
}
