use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{CurateError, Result};

// Raster formats picked up while walking the input folders
pub const IMG_FORMATS: &[&str] = &["jpg", "png"];

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<&'static str>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<&'static str> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().copied().collect())
}

/// A candidate box with absolute pixel corners.
///
/// Which frame the corners live in (detector input or source image) is decided by
/// whoever produced the value: detectors emit detector-frame boxes and
/// [`crate::postprocess::rescale_boxes`] maps them into the source frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionBox {
    pub class_id: u32,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl DetectionBox {
    pub fn new(class_id: u32, confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            class_id,
            confidence,
            x1,
            y1,
            x2,
            y2,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn intersection_area(&self, other: &DetectionBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 > x1 && y2 > y1 {
            (x2 - x1) * (y2 - y1)
        } else {
            0.0
        }
    }

    pub fn iou(&self, other: &DetectionBox) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// One line of a YOLO label file, geometry normalized to the image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelRow {
    pub class_id: u32,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

/// What the operator decided for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Predictions are correct: save image and labels to the auto bucket.
    AcceptAuto,
    /// Keep the image for later annotation: save to the manual bucket without labels.
    AcceptManual,
    Skip,
    Quit,
}

impl Decision {
    pub fn from_key(key: char) -> Result<Self> {
        match key {
            'y' => Ok(Decision::AcceptAuto),
            'n' => Ok(Decision::AcceptManual),
            's' => Ok(Decision::Skip),
            'q' => Ok(Decision::Quit),
            other => Err(CurateError::UnrecognizedInput(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Auto,
    Manual,
}

impl Bucket {
    pub fn dir_name(self) -> &'static str {
        match self {
            Bucket::Auto => "autoSchenk",
            Bucket::Manual => "manualSchenk",
        }
    }
}

/// Running totals of a verification session.
///
/// Their sum is the index of the next image to process, so a session seeded with
/// the totals printed by a previous run continues where that run stopped. The
/// counters are never decremented.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResumeState {
    pub auto: usize,
    pub manual: usize,
    pub skipped: usize,
}

impl ResumeState {
    pub fn new(auto: usize, manual: usize, skipped: usize) -> Self {
        Self {
            auto,
            manual,
            skipped,
        }
    }

    pub fn offset(&self) -> usize {
        self.auto + self.manual + self.skipped
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Auto => self.auto,
            Bucket::Manual => self.manual,
        }
    }

    pub fn increment(&mut self, bucket: Bucket) {
        match bucket {
            Bucket::Auto => self.auto += 1,
            Bucket::Manual => self.manual += 1,
        }
    }

    pub fn increment_skipped(&mut self) {
        self.skipped += 1;
    }
}

impl fmt::Display for ResumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Auto Annotated: {}. Manual Annotated: {}. Skipped {}",
            self.auto, self.manual, self.skipped
        )
    }
}
