//! On-screen preview through OpenCV highgui.
//!
//! Needs the native OpenCV libraries, so the backend is only compiled with the
//! `highgui` feature. The key and pixel helpers below do not depend on it.

use image::RgbImage;

#[cfg(feature = "highgui")]
pub use backend::{HighGuiInput, HighGuiPreview};

pub const SOURCE_WINDOW: &str = "source";
pub const PREDICTIONS_WINDOW: &str = "predictions";

const ESCAPE: u8 = 27;

/// Map a highgui key code to an operator key; `None` for no key
pub fn key_from_code(code: i32) -> Option<char> {
    if code < 0 {
        return None;
    }
    match (code & 0xFF) as u8 {
        ESCAPE => Some('q'),
        byte => Some(byte as char),
    }
}

/// Pixels in the BGR order highgui expects, row-major
pub fn to_bgr(image: &RgbImage) -> Vec<[u8; 3]> {
    image.pixels().map(|p| [p[2], p[1], p[0]]).collect()
}

#[cfg(feature = "highgui")]
mod backend {
    use image::RgbImage;
    use opencv::core::{Mat, VecN};
    use opencv::highgui;
    use opencv::prelude::*;

    use super::{key_from_code, to_bgr, PREDICTIONS_WINDOW, SOURCE_WINDOW};
    use crate::error::{CurateError, Result};
    use crate::input::InputProvider;
    use crate::preview::Preview;

    fn preview_error(e: opencv::Error) -> CurateError {
        CurateError::Preview(e.to_string())
    }

    fn to_mat(image: &RgbImage) -> Result<Mat> {
        let pixels: Vec<VecN<u8, 3>> = to_bgr(image).into_iter().map(VecN).collect();
        Mat::from_slice_rows_cols(&pixels, image.height() as usize, image.width() as usize)
            .map_err(preview_error)
    }

    /// Two windows: the full source image and the annotated copy.
    pub struct HighGuiPreview;

    impl HighGuiPreview {
        pub fn open() -> Result<Self> {
            highgui::named_window(SOURCE_WINDOW, highgui::WINDOW_NORMAL).map_err(preview_error)?;
            highgui::named_window(PREDICTIONS_WINDOW, highgui::WINDOW_AUTOSIZE)
                .map_err(preview_error)?;
            Ok(Self)
        }
    }

    impl Preview for HighGuiPreview {
        fn show(&mut self, source: &RgbImage, annotated: &RgbImage) -> Result<()> {
            highgui::imshow(SOURCE_WINDOW, &to_mat(source)?).map_err(preview_error)?;
            highgui::imshow(PREDICTIONS_WINDOW, &to_mat(annotated)?).map_err(preview_error)
        }

        fn close(&mut self) -> Result<()> {
            highgui::destroy_all_windows().map_err(preview_error)
        }
    }

    /// Keys pressed while a highgui window has focus.
    #[derive(Debug, Default)]
    pub struct HighGuiInput;

    impl InputProvider for HighGuiInput {
        fn next_key(&mut self) -> Result<char> {
            loop {
                // wait_key also pumps the window events, so frames are drawn here
                let code = highgui::wait_key(0).map_err(preview_error)?;
                if let Some(key) = key_from_code(code) {
                    return Ok(key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_key_from_code() {
        assert_eq!(key_from_code(-1), None);
        assert_eq!(key_from_code('y' as i32), Some('y'));
        assert_eq!(key_from_code(27), Some('q'));
        // some platforms set modifier bits above the low byte
        assert_eq!(key_from_code(0x10_0000 | 's' as i32), Some('s'));
    }

    #[test]
    fn test_to_bgr() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(1, 0, Rgb([10, 20, 30]));
        assert_eq!(to_bgr(&image), vec![[0, 0, 0], [30, 20, 10]]);
    }
}
