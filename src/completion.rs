use crate::discovery::WorkItem;
use crate::listing::Listing;
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::trace;

/// An output a stage is expected to leave behind: at least `min_count`
/// entries in `dir` whose names match `pattern`.
#[derive(Debug, Clone)]
pub struct OutputDescriptor {
    pub dir: PathBuf,
    pub pattern: Pattern,
    pub min_count: usize,
}

impl OutputDescriptor {
    pub fn new(
        dir: impl Into<PathBuf>,
        pattern: &str,
        min_count: usize,
    ) -> Result<Self, glob::PatternError> {
        Ok(Self {
            dir: dir.into(),
            pattern: Pattern::new(pattern)?,
            min_count,
        })
    }

    /// A single file with a literal name.
    pub fn exact(path: &Path) -> Self {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pattern = Pattern::new(&Pattern::escape(&name))
            .unwrap_or_else(|_| Pattern::default());
        Self {
            dir,
            pattern,
            min_count: 1,
        }
    }

    pub fn is_satisfied(&self, listing: &dyn Listing) -> bool {
        if !listing.is_dir(&self.dir) {
            return false;
        }
        let found = count_matches(listing, &self.dir, &self.pattern);
        trace!(
            "{} has {} entries matching '{}' (need {})",
            self.dir.display(),
            found,
            self.pattern,
            self.min_count
        );
        found >= self.min_count
    }
}

/// Count immediate entries of `dir` whose name matches `pattern`. An
/// unreadable directory counts as empty.
pub fn count_matches(listing: &dyn Listing, dir: &Path, pattern: &Pattern) -> usize {
    listing
        .list(dir)
        .map(|entries| {
            entries
                .iter()
                .filter(|entry| pattern.matches(&entry.name))
                .count()
        })
        .unwrap_or(0)
}

/// True only when every expected output of `item` is present on disk.
///
/// Nothing is cached: each call re-reads the listing. An item that declares
/// no outputs is never complete.
pub fn is_complete(item: &WorkItem, listing: &dyn Listing) -> bool {
    !item.outputs.is_empty() && item.outputs.iter().all(|d| d.is_satisfied(listing))
}
