use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

use crate::conversion::serialize_rows;
use crate::error::{CurateError, Result};
use crate::types::{Bucket, LabelRow, ResumeState};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Timestamp shared by every file written during one run
pub fn run_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// File stem for the `counter`-th sample of a run
pub fn sample_stem(timestamp: &str, counter: usize) -> String {
    format!("{}_{}", timestamp, counter)
}

pub(crate) fn save_jpeg(image: &RgbImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|e| CurateError::image(path, e))
}

/// The two output buckets of a verification session.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
    timestamp: String,
}

impl DatasetStore {
    /// Open the store under `root`, creating both bucket directories
    pub fn open(root: impl Into<PathBuf>, timestamp: impl Into<String>) -> Result<Self> {
        let store = Self {
            root: root.into(),
            timestamp: timestamp.into(),
        };
        for bucket in [Bucket::Auto, Bucket::Manual] {
            let dir = store.bucket_dir(bucket);
            fs::create_dir_all(&dir).map_err(|e| CurateError::io(&dir, e))?;
        }
        Ok(store)
    }

    pub fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.dir_name())
    }

    /// Write one sample into `bucket` and bump its counter.
    ///
    /// The counter is incremented only after the image and, when given, the label
    /// file were written, so a failed write never consumes a number.
    pub fn write(
        &self,
        bucket: Bucket,
        counters: &mut ResumeState,
        image: &RgbImage,
        labels: Option<&[LabelRow]>,
    ) -> Result<PathBuf> {
        let stem = sample_stem(&self.timestamp, counters.count(bucket));
        let dir = self.bucket_dir(bucket);
        let image_path = dir.join(format!("{}.jpg", stem));
        save_jpeg(image, &image_path)?;

        if let Some(rows) = labels {
            let label_path = dir.join(format!("{}.txt", stem));
            fs::write(&label_path, serialize_rows(rows))
                .map_err(|e| CurateError::io(&label_path, e))?;
        }

        counters.increment(bucket);
        Ok(image_path)
    }
}
