use crate::batch::{Stage, Step};
use crate::completion::{count_matches, OutputDescriptor};
use crate::config::{FittingConfig, ImageFormat, ResolvedPaths};
use crate::discovery::{self, WorkItem};
use crate::error::{Error, ItemError};
use crate::invoker::ToolInvocation;
use crate::listing::Listing;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};

use super::{require, KEYPOINT_SENTINEL};

/// Folder name the fitter is told to write per-frame results into.
pub const RESULTS_DIR: &str = "results";

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Fits a body mesh to every per-video keypoint folder, one fitter run per
/// video. Frames are looked up under the image root by the same folder name.
pub struct FittingStage {
    python: PathBuf,
    main_py: PathBuf,
    cfg_yaml: PathBuf,
    models_dir: PathBuf,
    json_root: PathBuf,
    images_root: PathBuf,
    out_root: PathBuf,
    options: FittingConfig,
    keypoints: Pattern,
    frames: Pattern,
    any: Pattern,
}

impl FittingStage {
    /// Checks the fitter checkout and both input roots before any work
    /// starts.
    pub fn new(
        paths: &ResolvedPaths,
        options: &FittingConfig,
        frame_format: ImageFormat,
        listing: &dyn Listing,
    ) -> Result<Self, Error> {
        let main_py = paths.smplifyx_dir.join("smplifyx").join("main.py");
        let cfg_yaml = paths.smplifyx_dir.join("cfg_files").join("fit_smplx.yaml");
        let models_dir = paths.smplifyx_dir.join("models");

        require(listing, "main.py", &main_py)?;
        require(listing, "cfg", &cfg_yaml)?;
        require(listing, "models/smplx", &models_dir.join("smplx"))?;
        require(listing, "models/vposer_v1_0", &models_dir.join("vposer_v1_0"))?;
        require(
            listing,
            "models/smplx_parts_segm.pkl",
            &models_dir.join("smplx_parts_segm.pkl"),
        )?;
        require(listing, "json_root", &paths.json_root)?;
        require(listing, "images_root", &paths.images_root)?;

        Ok(Self {
            python: paths.python.clone(),
            main_py,
            cfg_yaml,
            models_dir,
            json_root: paths.json_root.clone(),
            images_root: paths.images_root.clone(),
            out_root: paths.fit_out_root.clone(),
            options: options.clone(),
            keypoints: Pattern::new(KEYPOINT_SENTINEL)?,
            frames: Pattern::new(&format!("*.{}", frame_format))?,
            any: Pattern::new("*")?,
        })
    }

    fn out_dir(&self, item: &WorkItem) -> PathBuf {
        self.out_root.join(&item.id)
    }

    fn frames_dir(&self, item: &WorkItem) -> PathBuf {
        self.images_root.join(&item.id)
    }

    pub fn build_invocation(&self, item: &WorkItem) -> ToolInvocation {
        let opts = &self.options;
        let mut inv = ToolInvocation::new(&self.python)
            .arg(&self.main_py)
            .flag("--config", &self.cfg_yaml)
            .flag("--dataset", "openpose")
            .flag("--keyp_folder", &item.source)
            .flag("--img_folder", self.frames_dir(item))
            .flag("--output_folder", self.out_dir(item))
            .flag("--result_folder", RESULTS_DIR)
            .flag("--mesh_folder", RESULTS_DIR)
            .flag("--model_folder", &self.models_dir)
            .flag("--vposer_ckpt", self.models_dir.join("vposer_v1_0"))
            .flag("--part_segm_fn", self.models_dir.join("smplx_parts_segm.pkl"))
            .flag("--gender", opts.gender.to_string())
            .flag("--use_cuda", py_bool(opts.use_cuda))
            .flag("--interactive", "False")
            .flag("--visualize", py_bool(opts.visualize))
            .flag("--use_hands", "True")
            .flag("--use_face", "True")
            .flag("--use_face_contour", "False")
            .flag("--interpenetration", "False")
            .flag("--penalize_outside", "False")
            .flag("--max_collisions", "0")
            .flag("--use_vposer", "True")
            .flag("--save_meshes", "True");
        if let Some(pkg_dir) = self.main_py.parent() {
            inv = inv.current_dir(pkg_dir);
        }
        inv
    }
}

impl Stage for FittingStage {
    fn name(&self) -> &str {
        "fit"
    }

    fn work_root(&self) -> &Path {
        &self.json_root
    }

    fn discover(&self, listing: &dyn Listing) -> Result<Vec<WorkItem>, Error> {
        let only = (!self.options.only.is_empty()).then_some(self.options.only.as_slice());
        discovery::discover_dirs(listing, &self.json_root, &self.keypoints, only)
    }

    /// One result folder per keypoint file, so a fit killed part way
    /// through is picked up again on the next run.
    fn expected_outputs(&self, item: &WorkItem) -> Vec<OutputDescriptor> {
        vec![OutputDescriptor {
            dir: self.out_dir(item).join(RESULTS_DIR),
            pattern: self.any.clone(),
            min_count: item.sentinel_count.max(1),
        }]
    }

    fn prepare(&self, item: &WorkItem, listing: &dyn Listing) -> Result<Step, ItemError> {
        let frames = self.frames_dir(item);
        if !listing.is_dir(&frames) || count_matches(listing, &frames, &self.frames) == 0 {
            return Err(ItemError::prerequisite("frames", frames));
        }
        fs::create_dir_all(self.out_dir(item))?;
        Ok(Step::Invoke(self.build_invocation(item)))
    }
}
