use crate::batch::{Stage, Step};
use crate::completion::OutputDescriptor;
use crate::config::{HandScales, KeypointConfig, ResolvedPaths};
use crate::discovery::{self, WorkItem};
use crate::error::{Error, ItemError};
use crate::invoker::ToolInvocation;
use crate::listing::Listing;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};

use super::{require, KEYPOINT_SENTINEL};

const DEFAULT_HAND_SCALES: HandScales = HandScales {
    number: 6,
    range: 0.4,
};

/// Runs the pose estimator once per video, writing per-frame keypoint JSON
/// plus either raw frames or an overlay video.
pub struct KeypointStage {
    exe: PathBuf,
    models: PathBuf,
    video_dir: PathBuf,
    json_root: PathBuf,
    images_root: PathBuf,
    overlay_root: PathBuf,
    options: KeypointConfig,
    keypoints: Pattern,
    frames: Pattern,
}

impl KeypointStage {
    /// Fails when the executable, model folder or video folder is missing.
    pub fn new(
        paths: &ResolvedPaths,
        options: &KeypointConfig,
        listing: &dyn Listing,
    ) -> Result<Self, Error> {
        require(listing, "OpenPose exe", &paths.openpose_exe)?;
        require(listing, "Models folder", &paths.openpose_models)?;
        require(listing, "Data folder", &paths.video_dir)?;

        Ok(Self {
            exe: paths.openpose_exe.clone(),
            models: paths.openpose_models.clone(),
            video_dir: paths.video_dir.clone(),
            json_root: paths.json_root.clone(),
            images_root: paths.images_root.clone(),
            overlay_root: paths.overlay_root.clone(),
            options: options.clone(),
            keypoints: Pattern::new(KEYPOINT_SENTINEL)?,
            frames: Pattern::new(&format!("*.{}", options.images_format))?,
        })
    }

    fn json_dir(&self, item: &WorkItem) -> PathBuf {
        self.json_root.join(&item.id)
    }

    fn images_dir(&self, item: &WorkItem) -> PathBuf {
        self.images_root.join(&item.id)
    }

    fn overlay_video(&self, item: &WorkItem) -> PathBuf {
        self.overlay_root.join(format!("{}_annotated.avi", item.id))
    }

    pub fn build_invocation(&self, item: &WorkItem) -> ToolInvocation {
        let opts = &self.options;
        let hand_scales = opts.hand_scales.unwrap_or(DEFAULT_HAND_SCALES);
        let mut inv = ToolInvocation::new(&self.exe)
            .flag("--video", &item.source)
            .flag("--model_pose", "BODY_25")
            .arg("--hand")
            .arg("--face")
            .flag("--model_folder", &self.models)
            .flag("--write_json", self.json_dir(item))
            .flag("--display", "0")
            .flag("--num_gpu", opts.num_gpu.to_string())
            .flag("--num_gpu_start", opts.gpu_start.to_string())
            .flag("--net_resolution", "1312x736")
            .flag("--scale_number", "4")
            .flag("--scale_gap", "0.25")
            .flag("--hand_scale_number", hand_scales.number.to_string())
            .flag("--hand_scale_range", hand_scales.range.to_string())
            .echo(opts.show_logs);

        inv = if opts.video_overlay {
            inv.flag("--render_pose", "1")
                .flag("--write_video", self.overlay_video(item))
        } else {
            inv.flag("--render_pose", "0")
                .flag("--write_images", self.images_dir(item))
                .flag("--write_images_format", opts.images_format.to_string())
        };

        if let Some(res) = &opts.hand_res {
            inv = inv.flag("--hand_net_resolution", res);
        }
        inv
    }
}

impl Stage for KeypointStage {
    fn name(&self) -> &str {
        "keypoints"
    }

    fn work_root(&self) -> &Path {
        &self.video_dir
    }

    fn discover(&self, listing: &dyn Listing) -> Result<Vec<WorkItem>, Error> {
        discovery::discover_videos(listing, &self.video_dir, &self.options.video_extension)
    }

    fn expected_outputs(&self, item: &WorkItem) -> Vec<OutputDescriptor> {
        let mut outputs = vec![OutputDescriptor {
            dir: self.json_dir(item),
            pattern: self.keypoints.clone(),
            min_count: 1,
        }];
        if self.options.video_overlay {
            outputs.push(OutputDescriptor::exact(&self.overlay_video(item)));
        } else {
            outputs.push(OutputDescriptor {
                dir: self.images_dir(item),
                pattern: self.frames.clone(),
                min_count: 1,
            });
        }
        outputs
    }

    fn prepare(&self, item: &WorkItem, _listing: &dyn Listing) -> Result<Step, ItemError> {
        fs::create_dir_all(self.json_dir(item))?;
        if self.options.video_overlay {
            fs::create_dir_all(&self.overlay_root)?;
        } else {
            fs::create_dir_all(self.images_dir(item))?;
        }
        Ok(Step::Invoke(self.build_invocation(item)))
    }
}
