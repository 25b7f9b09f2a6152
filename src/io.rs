use image::RgbImage;
use jwalk::WalkDir;
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::error::{CurateError, Result};
use crate::types::get_image_extensions_set;

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| get_image_extensions_set().contains(ext))
}

/// Collect image paths under every root, in a stable order.
///
/// Roots are visited in the order given and each tree is walked sorted, so the
/// same folders always yield the same sequence. Paths found under several roots
/// are kept once per root.
pub fn discover_images<P: AsRef<Path>>(roots: &[P]) -> Vec<PathBuf> {
    info!("Getting image paths from input folders...");
    let mut image_paths = Vec::new();

    for root in roots {
        let root = root.as_ref();
        if !root.exists() {
            warn!("Input folder does not exist: {}", root.display());
            continue;
        }

        let found = WalkDir::new(root)
            .sort(true)
            .skip_hidden(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Failed to read directory entry under {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path())
            .filter(|path| has_image_extension(path));
        image_paths.extend(found);
    }

    info!("Found {} images.", image_paths.len());
    image_paths
}

/// Decode an image from disk as 8-bit RGB
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).map_err(|e| CurateError::image(path, e))?;
    Ok(image.to_rgb8())
}
