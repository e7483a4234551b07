use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

impl Entry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Read-only view of directory state.
///
/// Completion checks, work discovery and rename planning only ever look at
/// the filesystem through this trait, so they can run against `MemFs` in
/// tests. `list` returns entries sorted by name.
pub trait Listing {
    fn is_dir(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn list(&self, dir: &Path) -> io::Result<Vec<Entry>>;

    fn exists(&self, path: &Path) -> bool {
        self.is_dir(path) || self.is_file(path)
    }
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFs;

impl Listing for DiskFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| {
                let msg = format!("Error listing {}: {}", dir.display(), err);
                match err.into_io_error() {
                    Some(io_err) => io::Error::new(io_err.kind(), msg),
                    None => io::Error::new(io::ErrorKind::Other, msg),
                }
            })?;
            let kind = if entry.file_type().is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(Entry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        Ok(entries)
    }
}

/// In-memory directory tree. Parents of added paths are created implicitly.
#[derive(Debug, Default, Clone)]
pub struct MemFs {
    nodes: BTreeMap<PathBuf, EntryKind>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.nodes.insert(ancestor.to_path_buf(), EntryKind::Dir);
        }
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.nodes.insert(path.to_path_buf(), EntryKind::File);
        self
    }

    /// Remove a path and everything below it.
    pub fn remove(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        self.nodes.retain(|p, _| !p.starts_with(path));
        self
    }
}

impl Listing for MemFs {
    fn is_dir(&self, path: &Path) -> bool {
        self.nodes.get(path) == Some(&EntryKind::Dir)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.nodes.get(path) == Some(&EntryKind::File)
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<Entry>> {
        if !self.is_dir(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Error listing {}: not a directory", dir.display()),
            ));
        }
        // BTreeMap order keeps children sorted by name
        Ok(self
            .nodes
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .filter_map(|(path, kind)| {
                path.file_name().map(|name| Entry {
                    name: name.to_string_lossy().into_owned(),
                    kind: *kind,
                })
            })
            .collect())
    }
}
