use crate::batch::{Stage, Step};
use crate::completion::OutputDescriptor;
use crate::config::ResolvedPaths;
use crate::discovery::WorkItem;
use crate::error::{Error, ItemError};
use crate::flatten;
use crate::listing::Listing;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::fitting::RESULTS_DIR;

/// Copies every fitted video's per-frame meshes into one flat folder.
/// Frame folders are named `<video>_<frame>` by the fitter, so the result
/// is `<flat root>/<video>_<frame>.obj`.
///
/// Declares no outputs, so every discovered video is re-flattened; copies
/// are cheap and overwrite in place.
pub struct FlattenStage {
    out_root: PathBuf,
    flat_root: PathBuf,
    include_secondary: bool,
    only: Vec<String>,
}

impl FlattenStage {
    pub fn new(paths: &ResolvedPaths, include_secondary: bool, only: &[String]) -> Self {
        Self {
            out_root: paths.fit_out_root.clone(),
            flat_root: paths.flat_out_root.clone(),
            include_secondary,
            only: only.to_vec(),
        }
    }

    fn results_dir(&self, item: &WorkItem) -> PathBuf {
        item.source.join(RESULTS_DIR)
    }
}

impl Stage for FlattenStage {
    fn name(&self) -> &str {
        "flatten"
    }

    fn work_root(&self) -> &Path {
        &self.out_root
    }

    /// Every folder under the fitting output root that has a results folder.
    fn discover(&self, listing: &dyn Listing) -> Result<Vec<WorkItem>, Error> {
        if !listing.is_dir(&self.out_root) {
            return Err(Error::missing("Fitting output", &self.out_root));
        }
        let items = listing
            .list(&self.out_root)?
            .into_iter()
            .filter(|e| e.is_dir())
            .filter(|e| self.only.is_empty() || self.only.contains(&e.name))
            .filter(|e| listing.is_dir(&self.out_root.join(&e.name).join(RESULTS_DIR)))
            .map(|e| {
                let dir = self.out_root.join(&e.name);
                WorkItem::new(e.name, dir)
            })
            .collect();
        Ok(items)
    }

    fn expected_outputs(&self, _item: &WorkItem) -> Vec<OutputDescriptor> {
        Vec::new()
    }

    fn prepare(&self, item: &WorkItem, listing: &dyn Listing) -> Result<Step, ItemError> {
        let results = self.results_dir(item);
        if !listing.is_dir(&results) {
            return Err(ItemError::prerequisite("results folder", results));
        }
        let copied = flatten::flatten(&results, &self.flat_root, self.include_secondary)?;
        debug!("{}: {} mesh(es) flattened", item.id, copied);
        Ok(Step::Done)
    }
}
