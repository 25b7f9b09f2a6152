use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use log::{info, warn};
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use crate::error::{CurateError, Result};
use crate::store::save_jpeg;
use crate::types::DetectionBox;

pub const PREVIEW_WIDTH: u32 = 640;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const GLYPH_SCALE: u32 = 2;
const SEPARATOR: u32 = 4;

// 3x5 bitmaps for the digits 0-9, one row per entry, high bit on the left
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// A display surface for annotated frames.
pub trait Preview {
    /// Display the full source image together with its annotated copy
    fn show(&mut self, source: &RgbImage, annotated: &RgbImage) -> Result<()>;

    /// Release the display; called once when the session ends
    fn close(&mut self) -> Result<()>;
}

/// Writes the source and annotated frames side by side to a fixed file, for
/// headless setups with a viewer that reloads on change.
pub struct FilePreview {
    path: PathBuf,
}

impl FilePreview {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Preview for FilePreview {
    fn show(&mut self, source: &RgbImage, annotated: &RgbImage) -> Result<()> {
        save_jpeg(&side_by_side(source, annotated), &self.path)
    }

    fn close(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| CurateError::io(&self.path, e))?;
        }
        Ok(())
    }
}

/// Owns the preview for the length of a session and closes it on drop.
pub struct PreviewGuard<P: Preview> {
    preview: P,
    closed: bool,
}

impl<P: Preview> PreviewGuard<P> {
    pub fn new(preview: P) -> Self {
        Self {
            preview,
            closed: false,
        }
    }

    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.preview.close()
    }
}

impl<P: Preview> Deref for PreviewGuard<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.preview
    }
}

impl<P: Preview> DerefMut for PreviewGuard<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.preview
    }
}

impl<P: Preview> Drop for PreviewGuard<P> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close preview: {}", e);
        }
    }
}

fn draw_digits(canvas: &mut RgbImage, text: &str, x: i32, y: i32) {
    let mut cursor = x;
    for digit in text.chars().filter_map(|c| c.to_digit(10)) {
        let glyph = &DIGITS[digit as usize];
        for (row, &bits) in glyph.iter().enumerate() {
            for col in 0..3u32 {
                let mask: u8 = 0b100 >> col;
                if bits & mask != 0 {
                    draw_filled_rect_mut(
                        canvas,
                        Rect::at(
                            cursor + (col * GLYPH_SCALE) as i32,
                            y + (row as u32 * GLYPH_SCALE) as i32,
                        )
                        .of_size(GLYPH_SCALE, GLYPH_SCALE),
                        TEXT_COLOR,
                    );
                }
            }
        }
        cursor += (4 * GLYPH_SCALE) as i32;
    }
}

/// Draw the boxes onto a resized copy of the source image.
///
/// The copy is `preview_width` wide with the aspect ratio kept; each box gets its
/// class id burned into a tag above its top-left corner.
pub fn render(image: &RgbImage, boxes: &[DetectionBox], preview_width: u32) -> RgbImage {
    let preview_width = preview_width.max(1);
    let scale = preview_width as f32 / image.width().max(1) as f32;
    let preview_height = ((image.height() as f32 * scale).round() as u32).max(1);
    let mut canvas = imageops::resize(image, preview_width, preview_height, FilterType::Triangle);

    for bbox in boxes {
        let x = (bbox.x1 * scale).round() as i32;
        let y = (bbox.y1 * scale).round() as i32;
        let w = ((bbox.width() * scale).round() as u32).max(1);
        let h = ((bbox.height() * scale).round() as u32).max(1);
        draw_hollow_rect_mut(&mut canvas, Rect::at(x, y).of_size(w, h), BOX_COLOR);
        draw_hollow_rect_mut(
            &mut canvas,
            Rect::at(x + 1, y + 1).of_size(w.saturating_sub(2).max(1), h.saturating_sub(2).max(1)),
            BOX_COLOR,
        );

        let label = bbox.class_id.to_string();
        let tag_w = label.len() as u32 * 4 * GLYPH_SCALE + GLYPH_SCALE;
        let tag_h = 7 * GLYPH_SCALE;
        let tag_y = (y - tag_h as i32).max(0);
        draw_filled_rect_mut(&mut canvas, Rect::at(x, tag_y).of_size(tag_w, tag_h), BOX_COLOR);
        draw_digits(&mut canvas, &label, x + GLYPH_SCALE as i32, tag_y + GLYPH_SCALE as i32);
    }

    canvas
}

/// Place `left`, scaled to the height of `right`, next to `right`
pub fn side_by_side(left: &RgbImage, right: &RgbImage) -> RgbImage {
    let height = right.height().max(1);
    let scale = height as f32 / left.height().max(1) as f32;
    let left_width = ((left.width() as f32 * scale).round() as u32).max(1);
    let scaled = imageops::resize(left, left_width, height, FilterType::Triangle);

    let mut canvas = RgbImage::from_pixel(left_width + SEPARATOR + right.width(), height, Rgb([0, 0, 0]));
    imageops::replace(&mut canvas, &scaled, 0, 0);
    imageops::replace(&mut canvas, right, (left_width + SEPARATOR) as i64, 0);
    canvas
}

/// Print the candidate list next to the preview
pub fn describe(boxes: &[DetectionBox], names: &[String]) {
    for (i, bbox) in boxes.iter().enumerate() {
        let name = names
            .get(bbox.class_id as usize)
            .map(String::as_str)
            .unwrap_or("?");
        info!(
            "  #{} class {} ({}) conf {:.2} at ({:.0}, {:.0}, {:.0}, {:.0})",
            i + 1,
            bbox.class_id,
            name,
            bbox.confidence,
            bbox.x1,
            bbox.y1,
            bbox.x2,
            bbox.y2
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_resizes_and_draws() {
        let image = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        let boxes = [DetectionBox::new(7, 0.9, 20.0, 40.0, 100.0, 90.0)];
        let frame = render(&image, &boxes, 100);
        assert_eq!(frame.dimensions(), (100, 50));
        // left edge of the box, scaled by 0.5
        assert_eq!(frame.get_pixel(10, 35), &BOX_COLOR);
        // inside the box stays untouched
        assert_ne!(frame.get_pixel(30, 40), &BOX_COLOR);
    }

    #[test]
    fn test_render_without_boxes() {
        let image = RgbImage::from_pixel(64, 64, Rgb([10, 20, 30]));
        let frame = render(&image, &[], 32);
        assert_eq!(frame.dimensions(), (32, 32));
    }

    #[test]
    fn test_side_by_side() {
        let source = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        let annotated = render(&source, &[], 100);
        let frame = side_by_side(&source, &annotated);
        assert_eq!(frame.dimensions(), (100 + SEPARATOR + 100, 50));
        assert_eq!(frame.get_pixel(100 + SEPARATOR / 2, 25), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_file_preview_removed_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.jpg");
        {
            let mut guard = PreviewGuard::new(FilePreview::new(&path));
            let source = RgbImage::new(8, 4);
            guard.show(&source, &render(&source, &[], 4)).unwrap();
            assert!(path.exists());
            assert_eq!(image::open(&path).unwrap().width(), 4 + SEPARATOR + 4);
        }
        assert!(!path.exists());
    }
}
