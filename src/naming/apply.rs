use super::plan::{RenameEntry, RenamePlan};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug)]
pub struct ApplyFailure {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub error: io::Error,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub renamed: usize,
    pub unchanged: usize,
    pub failed: Vec<ApplyFailure>,
}

/// Carry out a rename plan.
///
/// An entry whose source and destination are the same file, or whose
/// source is gone while its destination exists, counts as unchanged: that
/// is what a second run over an already-renamed folder looks like. An
/// existing destination is never overwritten. A failing entry is recorded
/// and the rest of the plan still runs.
pub fn apply(plan: &RenamePlan) -> ApplyReport {
    let mut report = ApplyReport::default();

    for entry in &plan.entries {
        match apply_entry(entry) {
            Ok(true) => {
                report.renamed += 1;
                info!(
                    "[OK] {} -> {}",
                    display_name(&entry.source),
                    entry.destination.display()
                );
            }
            Ok(false) => report.unchanged += 1,
            Err(err) => {
                error!(
                    "Failed to rename {} -> {}: {}",
                    entry.source.display(),
                    entry.destination.display(),
                    err
                );
                report.failed.push(ApplyFailure {
                    source: entry.source.clone(),
                    destination: entry.destination.clone(),
                    error: err,
                });
            }
        }
    }

    info!(
        "Rename complete: {} renamed, {} unchanged, {} failed",
        report.renamed,
        report.unchanged,
        report.failed.len()
    );
    report
}

/// Returns whether a rename happened.
fn apply_entry(entry: &RenameEntry) -> io::Result<bool> {
    let (src, dst) = (&entry.source, &entry.destination);

    if is_same_file(src, dst) {
        // Only the case of the name differs; let the filesystem fix it up.
        if src.file_name() != dst.file_name() {
            fs::rename(src, dst)?;
            return Ok(true);
        }
        info!("[SKIP] Same name: {}", display_name(src));
        return Ok(false);
    }

    if !src.exists() && dst.exists() {
        info!("[SKIP] Already renamed: {}", display_name(dst));
        return Ok(false);
    }

    if dst.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination {} already exists", dst.display()),
        ));
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(src, dst)?;
    Ok(true)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
