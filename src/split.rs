use dashmap::DashSet;
use glob::{glob, Pattern};
use indicatif::ProgressBar;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::conversion::{parse_rows, serialize_rows, to_absolute};
use crate::error::{CurateError, Result};
use crate::types::{LabelRow, IMG_FORMATS};
use crate::utils::{create_progress_bar, ensure_dir};

pub const SPLIT_NAMES: [&str; 3] = ["train", "val", "test"];

/// An image and the label file sharing its stem
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SamplePair {
    pub image: PathBuf,
    pub label: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train: f32,
    pub val: f32,
    pub test: f32,
}

impl SplitRatios {
    pub fn validate(&self) -> Result<()> {
        let parts = [self.train, self.val, self.test];
        if parts.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(CurateError::InvalidSplit(
                "each split must be between 0.0 and 1.0".to_string(),
            ));
        }
        let total: f32 = parts.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(CurateError::InvalidSplit(format!(
                "train, val and test must add up to 1.0, got {}",
                total
            )));
        }
        Ok(())
    }
}

// Struct to hold the split pairs for training, validation, and testing
#[derive(Debug, Default)]
pub struct SplitData {
    pub train: Vec<SamplePair>,
    pub val: Vec<SamplePair>,
    pub test: Vec<SamplePair>,
}

impl SplitData {
    fn parts(&self) -> [(&'static str, &[SamplePair]); 3] {
        [
            (SPLIT_NAMES[0], self.train.as_slice()),
            (SPLIT_NAMES[1], self.val.as_slice()),
            (SPLIT_NAMES[2], self.test.as_slice()),
        ]
    }
}

/// Pair every top-level image in `input` with its label file
pub fn collect_pairs(input: &Path) -> Result<Vec<SamplePair>> {
    let escaped = Pattern::escape(&input.to_string_lossy());
    let mut pairs = Vec::new();

    for ext in IMG_FORMATS {
        let pattern = format!("{}/*.{}", escaped, ext);
        let entries = glob(&pattern)
            .map_err(|e| CurateError::InvalidSplit(format!("bad input folder pattern: {}", e)))?;
        for image in entries.filter_map(|entry| entry.ok()) {
            let label = image.with_extension("txt");
            if label.is_file() {
                pairs.push(SamplePair { image, label });
            } else {
                warn!("No label file for {}, skipping", image.display());
            }
        }
    }

    pairs.sort();
    Ok(pairs)
}

/// Shuffle the pairs and cut them into train, validation and test sets
pub fn split_pairs(mut pairs: Vec<SamplePair>, ratios: SplitRatios, seed: u64) -> Result<SplitData> {
    ratios.validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    pairs.shuffle(&mut rng);

    let train_len = (pairs.len() as f32 * ratios.train).floor() as usize;
    let val_len = ((pairs.len() as f32 * ratios.val).floor() as usize).min(pairs.len() - train_len);

    let train = pairs.drain(0..train_len).collect();
    let val = pairs.drain(0..val_len).collect();

    Ok(SplitData {
        train,
        val,
        test: pairs,
    })
}

// Slack for the six decimals a label row is stored with
const FRAME_TOLERANCE: f32 = 1e-5;

/// Whether the row's box lies inside the image it labels
pub fn within_frame(row: &LabelRow) -> bool {
    let b = to_absolute(row, 1, 1);
    b.x2 > b.x1
        && b.y2 > b.y1
        && b.x1 >= -FRAME_TOLERANCE
        && b.y1 >= -FRAME_TOLERANCE
        && b.x2 <= 1.0 + FRAME_TOLERANCE
        && b.y2 <= 1.0 + FRAME_TOLERANCE
}

/// Copy one pair, rewriting its label in canonical form
fn copy_pair(pair: &SamplePair, folder: &Path, batch: &str, class_ids: &DashSet<u32>) -> Result<()> {
    let stem = pair.image.file_stem().unwrap_or_default().to_string_lossy();
    let name = sanitize_filename::sanitize(format!("{}_{}", stem, batch));
    let ext = pair
        .image
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "jpg".to_string());

    let image_target = folder.join(format!("{}.{}", name, ext));
    fs::copy(&pair.image, &image_target).map_err(|e| CurateError::io(&pair.image, e))?;

    let text = fs::read_to_string(&pair.label).map_err(|e| CurateError::io(&pair.label, e))?;
    let rows = parse_rows(&text)?;
    if !rows.iter().all(within_frame) {
        warn!("Label box outside the image: {}", pair.label.display());
    }
    for row in &rows {
        class_ids.insert(row.class_id);
    }

    let label_target = folder.join(format!("{}.txt", name));
    fs::write(&label_target, serialize_rows(&rows)).map_err(|e| CurateError::io(&label_target, e))
}

/// Copy a batch of pairs into `folder` in parallel
pub fn copy_pairs(
    pairs: &[SamplePair],
    folder: &Path,
    batch: &str,
    class_ids: &DashSet<u32>,
    pb: &ProgressBar,
) -> Result<()> {
    info!("Copying data to: {}", folder.display());
    ensure_dir(folder)?;
    pairs.par_iter().try_for_each(|pair| {
        copy_pair(pair, folder, batch, class_ids)?;
        pb.inc(1);
        Ok(())
    })
}

/// Class names for the manifest: explicit names, or the ids seen in the labels
pub fn resolve_names(names: &[String], class_ids: &DashSet<u32>) -> Vec<String> {
    if !names.is_empty() {
        return names.to_vec();
    }
    match class_ids.iter().map(|id| *id).max() {
        Some(max) => (0..=max).map(|id| id.to_string()).collect(),
        None => Vec::new(),
    }
}

/// Create the data.yaml manifest describing the split dataset
pub fn create_data_yaml(output: &Path, names: &[String]) -> Result<PathBuf> {
    let data_yaml_path = output.join("data.yaml");
    let absolute_path = fs::canonicalize(output).map_err(|e| CurateError::io(output, e))?;

    let mut yaml_content = format!(
        "path: {}\ntrain: train\nval: val\ntest: test\nnc: {}\n",
        absolute_path.to_string_lossy(),
        names.len()
    );
    yaml_content.push_str("\nnames:\n");
    for (id, name) in names.iter().enumerate() {
        yaml_content.push_str(&format!("    {}: {}\n", id, name));
    }

    let file = File::create(&data_yaml_path).map_err(|e| CurateError::io(&data_yaml_path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(yaml_content.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| CurateError::io(&data_yaml_path, e))?;
    Ok(data_yaml_path)
}

/// Partitions a labeled pool into train/val/test folders plus a manifest.
pub struct Splitter {
    pub input: PathBuf,
    pub output: PathBuf,
    pub ratios: SplitRatios,
    pub seed: u64,
    /// Suffix appended to every copied file name
    pub batch_name: String,
    pub names: Vec<String>,
}

impl Splitter {
    pub fn run(&self) -> Result<SplitData> {
        self.ratios.validate()?;
        info!("Splitting data...");

        let pairs = collect_pairs(&self.input)?;
        info!("Found {} labeled images.", pairs.len());
        let split = split_pairs(pairs, self.ratios, self.seed)?;

        let class_ids = DashSet::new();
        for (name, pairs) in split.parts() {
            let folder = self.output.join(name);
            let label = format!("{}{}", name[..1].to_uppercase(), &name[1..]);
            let pb = create_progress_bar(pairs.len() as u64, &label);
            copy_pairs(pairs, &folder, &self.batch_name, &class_ids, &pb)?;
            pb.finish_with_message(format!("{} copy complete", label));
        }

        let names = resolve_names(&self.names, &class_ids);
        create_data_yaml(&self.output, &names)?;
        info!("Done splitting data!");
        Ok(split)
    }
}
