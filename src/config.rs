use crate::naming::{CollisionStrategy, NameCase, PlanOptions};
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Process-wide settings, loaded once at startup and passed down.
///
/// Every path left unset falls back to the historical layout under `root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub root: PathBuf,
    pub rename: RenameConfig,
    pub keypoints: KeypointConfig,
    pub fitting: FittingConfig,
    pub flatten: FlattenConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            rename: RenameConfig::default(),
            keypoints: KeypointConfig::default(),
            fitting: FittingConfig::default(),
            flatten: FlattenConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    pub label_table: Option<PathBuf>,
    pub case_sensitive: bool,
    pub collision: CollisionStrategy,
    pub name_case: NameCase,
    pub group_by_folder: bool,
}

impl Default for RenameConfig {
    fn default() -> Self {
        let options = PlanOptions::default();
        Self {
            label_table: None,
            case_sensitive: options.case_sensitive,
            collision: options.collision,
            name_case: options.name_case,
            group_by_folder: options.group_by_folder,
        }
    }
}

impl RenameConfig {
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            case_sensitive: self.case_sensitive,
            collision: self.collision,
            name_case: self.name_case,
            group_by_folder: self.group_by_folder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpg,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Png => write!(f, "png"),
            ImageFormat::Jpg => write!(f, "jpg"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandScales {
    pub number: u32,
    pub range: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeypointConfig {
    pub exe: Option<PathBuf>,
    pub models: Option<PathBuf>,
    pub videos: Option<PathBuf>,
    pub json_root: Option<PathBuf>,
    pub images_root: Option<PathBuf>,
    pub video_root: Option<PathBuf>,
    pub video_extension: String,
    pub images_format: ImageFormat,
    /// Write one overlay video per input instead of raw frames.
    pub video_overlay: bool,
    pub gpu_start: u32,
    pub num_gpu: u32,
    pub hand_res: Option<String>,
    pub hand_scales: Option<HandScales>,
    pub show_logs: bool,
}

impl Default for KeypointConfig {
    fn default() -> Self {
        Self {
            exe: None,
            models: None,
            videos: None,
            json_root: None,
            images_root: None,
            video_root: None,
            video_extension: "mp4".to_string(),
            images_format: ImageFormat::Png,
            video_overlay: false,
            gpu_start: 0,
            num_gpu: 1,
            hand_res: None,
            hand_scales: None,
            show_logs: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Neutral,
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Neutral => write!(f, "neutral"),
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FittingConfig {
    pub smplifyx_dir: Option<PathBuf>,
    pub python: PathBuf,
    pub out_root: Option<PathBuf>,
    pub gender: Gender,
    pub use_cuda: bool,
    pub visualize: bool,
    /// Restrict the run to these video folder names.
    pub only: Vec<String>,
}

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            smplifyx_dir: None,
            python: PathBuf::from("python"),
            out_root: None,
            gender: Gender::Neutral,
            use_cuda: false,
            visualize: false,
            only: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    pub out_dir: Option<PathBuf>,
    /// Copy `000.pkl` next to each mesh.
    pub include_secondary: bool,
}

/// Every location the pipeline touches, made absolute against `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub root: PathBuf,
    pub label_table: PathBuf,
    pub video_dir: PathBuf,
    pub openpose_exe: PathBuf,
    pub openpose_models: PathBuf,
    pub json_root: PathBuf,
    pub images_root: PathBuf,
    pub overlay_root: PathBuf,
    pub smplifyx_dir: PathBuf,
    pub python: PathBuf,
    pub fit_out_root: PathBuf,
    pub flat_out_root: PathBuf,
}

impl PipelineConfig {
    pub fn resolve(&self) -> std::io::Result<ResolvedPaths> {
        let root = if self.root.is_absolute() {
            self.root.clone()
        } else {
            env::current_dir()?.join(&self.root)
        };
        Ok(self.resolve_against(&root))
    }

    /// Resolve with an explicit absolute root; no environment lookups.
    pub fn resolve_against(&self, root: &Path) -> ResolvedPaths {
        let pick = |value: &Option<PathBuf>, default: &str| -> PathBuf {
            match value {
                Some(p) => root.join(p),
                None => root.join(default),
            }
        };
        let kp = &self.keypoints;

        ResolvedPaths {
            root: root.to_path_buf(),
            label_table: pick(&self.rename.label_table, "data/label_with_folders.csv"),
            video_dir: pick(&kp.videos, "data/Videos"),
            openpose_exe: pick(&kp.exe, "openpose/bin/OpenPoseDemo.exe"),
            openpose_models: pick(&kp.models, "openpose/models"),
            json_root: pick(&kp.json_root, "result/json"),
            images_root: pick(&kp.images_root, "result/images"),
            overlay_root: pick(&kp.video_root, "result/videos"),
            smplifyx_dir: pick(&self.fitting.smplifyx_dir, "smplify-x"),
            // bare interpreter names stay bare so they are looked up on PATH
            python: if self.fitting.python.components().count() > 1 {
                root.join(&self.fitting.python)
            } else {
                self.fitting.python.clone()
            },
            fit_out_root: pick(&self.fitting.out_root, "output"),
            flat_out_root: pick(&self.flatten.out_dir, "result/obj"),
        }
    }
}

/// Load `Config.toml` (or `path`) layered with `POSEFIT_*` environment
/// variables, e.g. `POSEFIT_KEYPOINTS__NUM_GPU=2`.
pub fn load_configuration(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let builder = Config::builder();
    let builder = match path {
        Some(path) => builder.add_source(ConfigFile::from(path).required(true)),
        None => builder.add_source(ConfigFile::with_name("Config").required(false)),
    };
    builder
        .add_source(
            Environment::with_prefix("POSEFIT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<PipelineConfig>()
}
