use log::warn;

use crate::error::{CurateError, Result};
use crate::types::{DetectionBox, LabelRow};

/// Convert an absolute-pixel box into a normalized YOLO row
pub fn to_normalized(bbox: &DetectionBox, image_width: u32, image_height: u32) -> Result<LabelRow> {
    if bbox.x2 <= bbox.x1 || bbox.y2 <= bbox.y1 || image_width == 0 || image_height == 0 {
        return Err(CurateError::InvalidGeometry {
            x1: bbox.x1,
            y1: bbox.y1,
            x2: bbox.x2,
            y2: bbox.y2,
        });
    }

    let (x1, y1, x2, y2) = (
        bbox.x1 as f64,
        bbox.y1 as f64,
        bbox.x2 as f64,
        bbox.y2 as f64,
    );
    let image_width = image_width as f64;
    let image_height = image_height as f64;

    Ok(LabelRow {
        class_id: bbox.class_id,
        x_center: (x1 + x2) / 2.0 / image_width,
        y_center: (y1 + y2) / 2.0 / image_height,
        width: (x2 - x1) / image_width,
        height: (y2 - y1) / image_height,
    })
}

/// Map a normalized row back to pixel corners
pub fn to_absolute(row: &LabelRow, image_width: u32, image_height: u32) -> DetectionBox {
    let image_width = image_width as f64;
    let image_height = image_height as f64;
    let half_w = row.width * image_width / 2.0;
    let half_h = row.height * image_height / 2.0;
    let cx = row.x_center * image_width;
    let cy = row.y_center * image_height;

    DetectionBox::new(
        row.class_id,
        1.0,
        (cx - half_w) as f32,
        (cy - half_h) as f32,
        (cx + half_w) as f32,
        (cy + half_h) as f32,
    )
}

/// Normalize every box, dropping degenerate ones
pub fn normalize_boxes(boxes: &[DetectionBox], image_width: u32, image_height: u32) -> Vec<LabelRow> {
    boxes
        .iter()
        .filter_map(|bbox| match to_normalized(bbox, image_width, image_height) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("Dropping box: {}", e);
                None
            }
        })
        .collect()
}

/// Serialize rows into the plain-text label format
pub fn serialize_rows(rows: &[LabelRow]) -> String {
    let mut yolo_data = String::with_capacity(rows.len() * 48);
    for row in rows {
        yolo_data.push_str(&format!(
            "{} {:.6} {:.6} {:.6} {:.6}\n",
            row.class_id, row.x_center, row.y_center, row.width, row.height
        ));
    }
    yolo_data
}

/// Parse a label file body back into rows
pub fn parse_rows(text: &str) -> Result<Vec<LabelRow>> {
    let mut rows = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CurateError::Label {
                line: line_no,
                msg: format!("expected 5 fields, found {}", fields.len()),
            });
        }

        // Older files wrote the class id as a float ("2.0")
        let class_id = fields[0]
            .parse::<u32>()
            .ok()
            .or_else(|| {
                fields[0]
                    .parse::<f64>()
                    .ok()
                    .filter(|v| *v >= 0.0 && v.fract() == 0.0)
                    .map(|v| v as u32)
            })
            .ok_or_else(|| CurateError::Label {
                line: line_no,
                msg: format!("invalid class id {:?}", fields[0]),
            })?;

        let mut geometry = [0.0f64; 4];
        for (slot, field) in geometry.iter_mut().zip(&fields[1..]) {
            *slot = field.parse::<f64>().map_err(|e| CurateError::Label {
                line: line_no,
                msg: format!("invalid coordinate {:?}: {}", field, e),
            })?;
        }

        rows.push(LabelRow {
            class_id,
            x_center: geometry[0],
            y_center: geometry[1],
            width: geometry[2],
            height: geometry[3],
        });
    }

    Ok(rows)
}
