//! Boundary to the object detector.
//!
//! The model itself lives outside this crate. A [`Detector`] receives the batched
//! input built by [`crate::preprocess::prepare`] and answers with raw candidates in
//! the detector-input frame; suppression and rescaling happen afterwards in
//! [`crate::postprocess`].

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{CurateError, Result};
use crate::preprocess::DetectorInput;
use crate::types::DetectionBox;

pub trait Detector {
    /// Raw candidates for one image, corners in detector-input pixels
    fn detect(&mut self, image_path: &Path, input: &DetectorInput) -> Result<Vec<DetectionBox>>;

    /// Class names indexed by class id
    fn class_names(&self) -> &[String];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPrediction {
    pub class_id: u32,
    pub confidence: f32,
    /// [x1, y1, x2, y2]
    pub bbox: [f32; 4],
}

/// Predictions an external detector run wrote for one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionFile {
    /// [width, height] of the detector input the predictions refer to
    pub input_size: [u32; 2],
    pub predictions: Vec<RawPrediction>,
}

/// Reads predictions from JSON sidecars in a tree mirroring the input roots.
///
/// `<root>/seq/frame_1.jpg` is answered from `<predictions_dir>/seq/frame_1.json`.
/// Images outside every root fall back to `<predictions_dir>/<stem>.json`.
pub struct PrecomputedDetector {
    predictions_dir: PathBuf,
    roots: Vec<PathBuf>,
    names: Vec<String>,
}

impl PrecomputedDetector {
    pub fn new(predictions_dir: impl Into<PathBuf>, roots: Vec<PathBuf>, names: Vec<String>) -> Self {
        Self {
            predictions_dir: predictions_dir.into(),
            roots,
            names,
        }
    }

    pub fn sidecar_path(&self, image_path: &Path) -> PathBuf {
        let stem = image_path.file_stem().unwrap_or_default().to_string_lossy();
        let file_name = format!("{}.json", stem);
        let relative_dir = self
            .roots
            .iter()
            .find_map(|root| image_path.strip_prefix(root).ok())
            .and_then(Path::parent);
        match relative_dir {
            Some(dir) => self.predictions_dir.join(dir).join(file_name),
            None => self.predictions_dir.join(file_name),
        }
    }

    /// Fail if two images would read the same sidecar
    pub fn check_unique(&self, image_paths: &[PathBuf]) -> Result<()> {
        let mut seen: HashMap<PathBuf, &Path> = HashMap::with_capacity(image_paths.len());
        for path in image_paths {
            let sidecar = self.sidecar_path(path);
            if let Some(first) = seen.insert(sidecar.clone(), path) {
                return Err(CurateError::Detector(format!(
                    "{} and {} both map to predictions {}",
                    first.display(),
                    path.display(),
                    sidecar.display()
                )));
            }
        }
        Ok(())
    }
}

/// Read a prediction sidecar by parsing directly from the file stream
pub fn read_prediction_file(path: &Path) -> Result<PredictionFile> {
    let file = File::open(path).map_err(|e| CurateError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CurateError::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl Detector for PrecomputedDetector {
    fn detect(&mut self, image_path: &Path, input: &DetectorInput) -> Result<Vec<DetectionBox>> {
        let sidecar = self.sidecar_path(image_path);
        if !sidecar.exists() {
            debug!("No predictions for {}", image_path.display());
            return Ok(Vec::new());
        }

        let file = read_prediction_file(&sidecar)?;
        let expected = input.letterbox.input_size;
        if file.input_size != [expected, expected] {
            return Err(CurateError::Detector(format!(
                "{} was produced for a {}x{} input, expected {}x{}",
                sidecar.display(),
                file.input_size[0],
                file.input_size[1],
                expected,
                expected
            )));
        }

        Ok(file
            .predictions
            .into_iter()
            .map(|p| {
                let [x1, y1, x2, y2] = p.bbox;
                DetectionBox::new(p.class_id, p.confidence, x1, y1, x2, y2)
            })
            .collect())
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::prepare;
    use image::RgbImage;
    use std::fs;

    #[test]
    fn test_precomputed_detector_reads_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("frame_01.json"),
            r#"{"input_size":[64,64],"predictions":[{"class_id":3,"confidence":0.8,"bbox":[1.0,2.0,30.0,40.0]}]}"#,
        )
        .unwrap();

        let mut detector = PrecomputedDetector::new(dir.path(), vec![], vec![]);
        let input = prepare(&RgbImage::new(64, 64), 64, 32);

        let boxes = detector
            .detect(Path::new("/images/frame_01.jpg"), &input)
            .unwrap();
        assert_eq!(boxes, vec![DetectionBox::new(3, 0.8, 1.0, 2.0, 30.0, 40.0)]);

        let missing = detector
            .detect(Path::new("/images/frame_02.jpg"), &input)
            .unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_precomputed_detector_rejects_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{"input_size":[640,640],"predictions":[]}"#,
        )
        .unwrap();
        let mut detector = PrecomputedDetector::new(dir.path(), vec![], vec![]);
        let input = prepare(&RgbImage::new(64, 64), 64, 32);
        assert!(matches!(
            detector.detect(Path::new("a.png"), &input),
            Err(CurateError::Detector(_))
        ));
    }

    #[test]
    fn test_same_stem_in_different_folders() {
        let dir = tempfile::tempdir().unwrap();
        let preds = dir.path().join("preds");
        fs::create_dir_all(preds.join("seqA")).unwrap();
        fs::create_dir_all(preds.join("seqB")).unwrap();
        fs::write(
            preds.join("seqA/frame_1.json"),
            r#"{"input_size":[64,64],"predictions":[{"class_id":3,"confidence":0.9,"bbox":[1.0,2.0,30.0,40.0]}]}"#,
        )
        .unwrap();
        fs::write(
            preds.join("seqB/frame_1.json"),
            r#"{"input_size":[64,64],"predictions":[{"class_id":7,"confidence":0.6,"bbox":[5.0,5.0,20.0,20.0]}]}"#,
        )
        .unwrap();

        let root = PathBuf::from("/data");
        let images = vec![root.join("seqA/frame_1.jpg"), root.join("seqB/frame_1.png")];
        let mut detector = PrecomputedDetector::new(&preds, vec![root], vec![]);
        detector.check_unique(&images).unwrap();

        let input = prepare(&RgbImage::new(64, 64), 64, 32);
        let a = detector.detect(&images[0], &input).unwrap();
        let b = detector.detect(&images[1], &input).unwrap();
        assert_eq!(a, vec![DetectionBox::new(3, 0.9, 1.0, 2.0, 30.0, 40.0)]);
        assert_eq!(b, vec![DetectionBox::new(7, 0.6, 5.0, 5.0, 20.0, 20.0)]);
    }

    #[test]
    fn test_check_unique_rejects_colliding_sidecars() {
        let roots = vec![PathBuf::from("/seqA"), PathBuf::from("/seqB")];
        let detector = PrecomputedDetector::new("/preds", roots, vec![]);
        let images = vec![
            PathBuf::from("/seqA/frame_1.jpg"),
            PathBuf::from("/seqB/frame_1.png"),
        ];
        assert_eq!(
            detector.sidecar_path(&images[0]),
            PathBuf::from("/preds/frame_1.json")
        );
        assert!(matches!(
            detector.check_unique(&images),
            Err(CurateError::Detector(_))
        ));
    }
}
