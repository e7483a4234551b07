use clap::{Args, Parser, Subcommand};
use posefit::config::Gender;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "posefit")]
#[command(about = "Batch pose keypoints and body-mesh fits over a video corpus", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./Config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rename raw videos to their labels from the label table
    Rename(RenameArgs),
    /// Extract per-frame 2D keypoints for every video
    Keypoints(KeypointArgs),
    /// Fit body meshes to every per-video keypoint folder
    Fit(FitArgs),
    /// Copy per-frame meshes into one flat folder
    Flatten(FlattenArgs),
    /// Print the effective configuration
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Label table (CSV with VIDEO, LABEL, FOLDER_NAME, ID)
    #[arg(long)]
    pub labels: Option<PathBuf>,
    /// Folder holding the raw videos
    #[arg(long)]
    pub videos: Option<PathBuf>,
    /// Perform the renames; without this only the plan is printed
    #[arg(long)]
    pub apply: bool,
    /// Match VIDEO names regardless of case
    #[arg(long)]
    pub ignore_case: bool,
    /// Move files into their FOLDER_NAME subfolder
    #[arg(long)]
    pub group_by_folder: bool,
}

#[derive(Debug, Args)]
pub struct KeypointArgs {
    /// Re-run videos whose outputs already exist
    #[arg(long)]
    pub force: bool,
    /// Write an overlay video instead of raw frames (JSON is always written)
    #[arg(long)]
    pub video_overlay: bool,
    /// Stream the tool's output while it runs
    #[arg(long)]
    pub show_logs: bool,
    #[arg(long)]
    pub num_gpu: Option<u32>,
    #[arg(long)]
    pub gpu_start: Option<u32>,
}

#[derive(Debug, Args)]
pub struct FitArgs {
    /// Re-run videos whose results already exist
    #[arg(long)]
    pub force: bool,
    /// Only process these video folder names
    #[arg(long, num_args = 1..)]
    pub only: Vec<String>,
    #[arg(long, value_enum)]
    pub gender: Option<Gender>,
    #[arg(long)]
    pub use_cuda: bool,
    #[arg(long)]
    pub visualize: bool,
}

#[derive(Debug, Args)]
pub struct FlattenArgs {
    /// Flatten a single results folder, e.g. output/D0001N/results
    #[arg(long)]
    pub results_dir: Option<PathBuf>,
    /// Destination folder (default: result/obj under the root)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
    /// Copy 000.pkl too
    #[arg(long)]
    pub also_pkls: bool,
    /// Only process these video folder names
    #[arg(long, num_args = 1..)]
    pub only: Vec<String>,
}
