use std::cmp::Ordering;

use crate::preprocess::Letterbox;
use crate::types::DetectionBox;

pub const CONF_THRESHOLD: f32 = 0.05;
pub const IOU_THRESHOLD: f32 = 0.45;
pub const MAX_DETECTIONS: usize = 300;

/// Thresholds for suppression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Candidates below this confidence are dropped before suppression
    pub confidence: f32,
    /// Intersection over union threshold
    pub iou: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: CONF_THRESHOLD,
            iou: IOU_THRESHOLD,
        }
    }
}

/// Class-agnostic greedy non-max suppression.
///
/// Boxes of different classes suppress each other; the detector's class channel
/// is not used for filtering here. Survivors are ordered by descending confidence.
pub fn non_max_suppression(mut boxes: Vec<DetectionBox>, thresholds: Thresholds) -> Vec<DetectionBox> {
    boxes.retain(|b| b.confidence >= thresholds.confidence);
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<DetectionBox> = Vec::new();
    'outer: for candidate in boxes {
        for k in &kept {
            if k.iou(&candidate) > thresholds.iou {
                continue 'outer;
            }
        }
        kept.push(candidate);
        if kept.len() >= MAX_DETECTIONS {
            break;
        }
    }
    kept
}

/// Map detector-frame boxes back onto the source image, clipping to its bounds
pub fn rescale_boxes(
    boxes: &[DetectionBox],
    letterbox: &Letterbox,
    src_width: u32,
    src_height: u32,
) -> Vec<DetectionBox> {
    let gain = if letterbox.gain > 0.0 { letterbox.gain } else { 1.0 };
    let max_x = src_width as f32;
    let max_y = src_height as f32;
    let unpad_x = |x: f32| ((x - letterbox.pad_x as f32) / gain).clamp(0.0, max_x);
    let unpad_y = |y: f32| ((y - letterbox.pad_y as f32) / gain).clamp(0.0, max_y);

    boxes
        .iter()
        .map(|b| DetectionBox {
            x1: unpad_x(b.x1),
            y1: unpad_y(b.y1),
            x2: unpad_x(b.x2),
            y2: unpad_y(b.y2),
            ..*b
        })
        .collect()
}

/// Class names of the boxes read left to right and concatenated.
///
/// For digit detectors this is the number shown in the image.
pub fn reading_string(boxes: &[DetectionBox], names: &[String]) -> String {
    let mut ordered: Vec<&DetectionBox> = boxes.iter().collect();
    ordered.sort_by(|a, b| a.x1.partial_cmp(&b.x1).unwrap_or(Ordering::Equal));
    ordered
        .iter()
        .map(|b| {
            names
                .get(b.class_id as usize)
                .cloned()
                .unwrap_or_else(|| b.class_id.to_string())
        })
        .collect()
}
