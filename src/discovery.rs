use crate::completion::OutputDescriptor;
use crate::error::Error;
use crate::listing::Listing;
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    SkippedComplete,
    Running,
    Succeeded,
    Failed,
}

/// One unit of pipeline work: a video file or a per-video directory.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: String,
    pub source: PathBuf,
    pub outputs: Vec<OutputDescriptor>,
    pub status: ItemStatus,
    /// Sentinel files found in the item's folder by directory-mode
    /// discovery; 0 for video items.
    pub sentinel_count: usize,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            outputs: Vec::new(),
            status: ItemStatus::Pending,
            sentinel_count: 0,
        }
    }
}

/// One item per `*.<extension>` file directly under `root`, keyed by file
/// stem, in name order. The extension match ignores case.
pub fn discover_videos(
    listing: &dyn Listing,
    root: &Path,
    extension: &str,
) -> Result<Vec<WorkItem>, Error> {
    if !listing.is_dir(root) {
        return Err(Error::missing("Video folder", root));
    }
    let wanted = extension.trim_start_matches('.');

    let mut items: Vec<WorkItem> = listing
        .list(root)?
        .into_iter()
        .filter(|entry| entry.is_file())
        .filter_map(|entry| {
            let path = root.join(&entry.name);
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(wanted))
                .unwrap_or(false);
            if !matches {
                return None;
            }
            let stem = path.file_stem()?.to_string_lossy().into_owned();
            Some(WorkItem::new(stem, path))
        })
        .collect();
    items.sort_by(|a, b| a.source.cmp(&b.source));

    debug!("Found {} video(s) under {}", items.len(), root.display());
    Ok(items)
}

/// One item per immediate subdirectory of `root` holding at least one file
/// that matches `sentinel`, keyed by directory name. Each item records how
/// many sentinel files it holds.
///
/// With `only`, directories whose name is not listed are dropped. Listed
/// names with no matching directory are ignored. A subdirectory that cannot
/// be read is logged and skipped.
pub fn discover_dirs(
    listing: &dyn Listing,
    root: &Path,
    sentinel: &Pattern,
    only: Option<&[String]>,
) -> Result<Vec<WorkItem>, Error> {
    if !listing.is_dir(root) {
        return Err(Error::missing("Work root", root));
    }

    let mut items = Vec::new();
    for entry in listing.list(root)?.into_iter().filter(|e| e.is_dir()) {
        if let Some(only) = only {
            if !only.iter().any(|name| name == &entry.name) {
                continue;
            }
        }
        let dir = root.join(&entry.name);
        let children = match listing.list(&dir) {
            Ok(children) => children,
            Err(err) => {
                warn!("Skipping {}: {}", dir.display(), err);
                continue;
            }
        };
        let count = children
            .iter()
            .filter(|child| child.is_file() && sentinel.matches(&child.name))
            .count();
        if count > 0 {
            let mut item = WorkItem::new(entry.name, dir);
            item.sentinel_count = count;
            items.push(item);
        } else {
            debug!("Ignoring {}: no '{}' files", dir.display(), sentinel);
        }
    }
    items.sort_by(|a, b| a.id.cmp(&b.id));

    debug!("Found {} work folder(s) under {}", items.len(), root.display());
    Ok(items)
}
