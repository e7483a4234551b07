use crate::batch::{BatchSummary, ItemReport};
use crate::discovery::WorkItem;

/// Trait for reporting batch progress.
///
/// The CLI implements it with an indicatif bar. All methods have default
/// no-op implementations.
pub trait BatchReporter {
    fn on_batch_start(&self, _stage: &str, _total: usize) {}
    fn on_item_start(&self, _item: &WorkItem) {}
    fn on_item_finish(&self, _report: &ItemReport) {}
    fn on_batch_complete(&self, _summary: &BatchSummary) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl BatchReporter for SilentReporter {}
