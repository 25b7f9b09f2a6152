use log::info;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io::load_image;
use crate::store::save_jpeg;
use crate::utils::{create_progress_bar, ensure_dir};

/// Re-encodes images into one folder under bare counter names (`0.jpg`, `1.jpg`, ...).
pub struct Extractor {
    output: PathBuf,
    count: usize,
}

impl Extractor {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Save one image as the next numbered file; the folder is created on first use
    pub fn save(&mut self, image_path: &Path) -> Result<PathBuf> {
        let image = load_image(image_path)?;
        ensure_dir(&self.output)?;
        let target = self.output.join(format!("{}.jpg", self.count));
        save_jpeg(&image, &target)?;
        self.count += 1;
        Ok(target)
    }

    /// Extract every image, returning how many were written
    pub fn extract(&mut self, image_paths: &[PathBuf]) -> Result<usize> {
        info!("Extracting images...");
        let pb = create_progress_bar(image_paths.len() as u64, "Extract");
        let start = self.count;
        for path in image_paths {
            self.save(path)?;
            pb.inc(1);
        }
        pb.finish_with_message("Extraction complete");
        info!("Done extracting images!");
        Ok(self.count - start)
    }
}
