use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use crate::postprocess::{CONF_THRESHOLD, IOU_THRESHOLD};
use crate::preview::PREVIEW_WIDTH;
use crate::session::{INPUT_SIZE, STRIDE};

/// Curate YOLO training data by verifying detector predictions.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Review predictions image by image: y = save with labels, n = save for
    /// manual annotation, s = skip, q = quit
    Verify(VerifyArgs),
    /// Copy every image into one folder as 0.jpg, 1.jpg, ...
    Extract(ExtractArgs),
    /// Split a labeled folder into train/val/test and write data.yaml
    Split(SplitArgs),
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Folders searched recursively for .jpg and .png images
    #[arg(short = 'i', long = "input", required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Output folder holding the autoSchenk and manualSchenk buckets
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Folder of <image stem>.json prediction files, laid out like the input folders
    #[arg(short = 'p', long = "predictions")]
    pub predictions: PathBuf,

    /// Images already saved to the auto bucket by earlier runs
    #[arg(long = "auto-count", default_value_t = 0)]
    pub auto_count: usize,

    /// Images already saved to the manual bucket by earlier runs
    #[arg(long = "manual-count", default_value_t = 0)]
    pub manual_count: usize,

    /// Images skipped by earlier runs
    #[arg(long = "skip-count", default_value_t = 0)]
    pub skip_count: usize,

    /// Side of the square detector input
    #[arg(long = "img-size", default_value_t = INPUT_SIZE, value_parser = validate_size)]
    pub img_size: u32,

    /// Detector stride, the input size is rounded up to a multiple of it
    #[arg(long = "stride", default_value_t = STRIDE, value_parser = validate_size)]
    pub stride: u32,

    /// Confidence floor applied before suppression
    #[arg(long = "conf", default_value_t = CONF_THRESHOLD, value_parser = validate_fraction)]
    pub conf: f32,

    /// IoU threshold for class-agnostic suppression
    #[arg(long = "iou", default_value_t = IOU_THRESHOLD, value_parser = validate_fraction)]
    pub iou: f32,

    /// Width of the preview frame
    #[arg(long = "preview-width", default_value_t = PREVIEW_WIDTH, value_parser = validate_size)]
    pub preview_width: u32,

    /// Show the images in highgui windows and read keys from them
    /// (needs a build with the `highgui` feature)
    #[arg(long = "window")]
    pub window: bool,

    /// Where the preview frame is written when not using --window
    /// (default: <output>/preview.jpg)
    #[arg(long = "preview")]
    pub preview: Option<PathBuf>,

    /// Class names indexed by class id
    #[arg(long = "names", use_value_delimiter = true)]
    pub names: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Folders searched recursively for .jpg and .png images
    #[arg(short = 'i', long = "input", required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Destination folder
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    /// Folder containing images and same-stem label files
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Folder receiving train/, val/, test/ and data.yaml
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Proportion of the data used for training
    #[arg(long = "train", default_value_t = 0.9, value_parser = validate_fraction)]
    pub train: f32,

    /// Proportion of the data used for validation
    #[arg(long = "val", default_value_t = 0.05, value_parser = validate_fraction)]
    pub val: f32,

    /// Proportion of the data used for testing
    #[arg(long = "test", default_value_t = 0.05, value_parser = validate_fraction)]
    pub test: f32,

    /// Seed for random shuffling
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    /// Suffix added to copied file names (default: run timestamp)
    #[arg(long = "batch-name")]
    pub batch_name: Option<String>,

    /// Class names for data.yaml, indexed by class id
    #[arg(long = "names", use_value_delimiter = true)]
    pub names: Vec<String>,
}

// Validate that the value is a positive pixel count
pub fn validate_size(s: &str) -> Result<u32, String> {
    match u32::from_str(s) {
        Ok(val) if val > 0 => Ok(val),
        _ => Err("value must be a positive integer".to_string()),
    }
}

// Validate that the value is between 0.0 and 1.0
pub fn validate_fraction(s: &str) -> Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("value must be between 0.0 and 1.0".to_string()),
    }
}
