use crate::listing::{DiskFs, Listing};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Mesh written by the fitter into every per-frame result folder.
pub const PRIMARY_ARTIFACT: &str = "000.obj";
/// Fit parameters written next to the mesh.
pub const SECONDARY_ARTIFACT: &str = "000.pkl";

/// Copy `<results_root>/<frame>/000.obj` to `<dest_dir>/<frame>.obj` for
/// every frame folder that has one, keeping modification times. Returns
/// the number of primary artifacts copied.
///
/// Frame folders without a mesh are skipped. With `include_secondary` the
/// matching `000.pkl` is copied to `<frame>.pkl` as well.
pub fn flatten(results_root: &Path, dest_dir: &Path, include_secondary: bool) -> io::Result<usize> {
    fs::create_dir_all(dest_dir)?;

    let mut copied = 0;
    for entry in DiskFs.list(results_root)?.into_iter().filter(|e| e.is_dir()) {
        let frame_dir = results_root.join(&entry.name);

        if copy_artifact(&frame_dir, PRIMARY_ARTIFACT, &entry.name, dest_dir)? {
            copied += 1;
        } else {
            debug!("No {} in {}", PRIMARY_ARTIFACT, frame_dir.display());
        }
        if include_secondary {
            copy_artifact(&frame_dir, SECONDARY_ARTIFACT, &entry.name, dest_dir)?;
        }
    }

    info!("Copied {} {}(s) to {}", copied, PRIMARY_ARTIFACT, dest_dir.display());
    Ok(copied)
}

fn copy_artifact(frame_dir: &Path, artifact: &str, frame: &str, dest_dir: &Path) -> io::Result<bool> {
    let src = frame_dir.join(artifact);
    if !src.is_file() {
        return Ok(false);
    }
    let dst = match Path::new(artifact).extension() {
        Some(ext) => dest_dir.join(format!("{}.{}", frame, ext.to_string_lossy())),
        None => dest_dir.join(frame),
    };
    copy_preserving_mtime(&src, &dst)?;
    Ok(true)
}

pub fn copy_preserving_mtime(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let modified = fs::metadata(src)?.modified()?;
    fs::File::options().write(true).open(dst)?.set_modified(modified)?;
    Ok(())
}
