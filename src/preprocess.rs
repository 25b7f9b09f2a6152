use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::contrast::equalize_histogram;
use ndarray::Array4;

/// Gray value used for the letterbox border
pub const PAD_VALUE: u8 = 114;

/// How a source image was scaled and padded into the square detector input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Scale factor applied to the source image
    pub gain: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    /// Side length of the square detector input
    pub input_size: u32,
}

impl Letterbox {
    /// Compute the letterbox for a source image of the given size
    pub fn fit(src_width: u32, src_height: u32, input_size: u32) -> Self {
        let input_size = input_size.max(1);
        let gain = (input_size as f32 / src_width.max(1) as f32)
            .min(input_size as f32 / src_height.max(1) as f32);
        let (new_w, new_h) = scaled_size(src_width, src_height, gain, input_size);

        Self {
            gain,
            pad_x: (input_size - new_w) / 2,
            pad_y: (input_size - new_h) / 2,
            input_size,
        }
    }
}

/// The batched detector input for one image
#[derive(Debug, Clone)]
pub struct DetectorInput {
    /// Shape `[1, 3, input_size, input_size]`, values in [0, 1]
    pub tensor: Array4<f32>,
    pub letterbox: Letterbox,
}

fn scaled_size(src_width: u32, src_height: u32, gain: f32, input_size: u32) -> (u32, u32) {
    let new_w = ((src_width as f32 * gain).round() as u32).clamp(1, input_size);
    let new_h = ((src_height as f32 * gain).round() as u32).clamp(1, input_size);
    (new_w, new_h)
}

/// Round `size` up to the next multiple of `stride`, never below one stride
pub fn make_divisible(size: u32, stride: u32) -> u32 {
    let stride = stride.max(1);
    size.max(1).div_ceil(stride) * stride
}

/// Resize with preserved aspect ratio and pad to a square canvas
pub fn letterbox(image: &RgbImage, input_size: u32) -> (RgbImage, Letterbox) {
    let geometry = Letterbox::fit(image.width(), image.height(), input_size);
    let input_size = geometry.input_size;
    let (new_w, new_h) = scaled_size(image.width(), image.height(), geometry.gain, input_size);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(input_size, input_size, Rgb([PAD_VALUE; 3]));
    imageops::replace(
        &mut canvas,
        &resized,
        geometry.pad_x as i64,
        geometry.pad_y as i64,
    );

    (canvas, geometry)
}

/// Grayscale conversion followed by histogram equalization
pub fn enhance_contrast(image: &RgbImage) -> GrayImage {
    let gray = DynamicImage::ImageRgb8(image.clone()).to_luma8();
    equalize_histogram(&gray)
}

/// Build the detector input for a decoded source image.
///
/// The gray channel is replicated into all three input channels, since the
/// detector expects RGB input.
pub fn prepare(image: &RgbImage, input_size: u32, stride: u32) -> DetectorInput {
    let input_size = make_divisible(input_size, stride);
    let (canvas, geometry) = letterbox(image, input_size);
    let enhanced = enhance_contrast(&canvas);

    let side = input_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in enhanced.enumerate_pixels() {
        let value = pixel[0] as f32 / 255.0;
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] = value;
        }
    }

    DetectorInput {
        tensor,
        letterbox: geometry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_divisible() {
        assert_eq!(make_divisible(640, 32), 640);
        assert_eq!(make_divisible(641, 32), 672);
        assert_eq!(make_divisible(100, 0), 100);
        assert_eq!(make_divisible(0, 32), 32);
        assert_eq!(make_divisible(0, 0), 1);
    }

    #[test]
    fn test_zero_input_size_does_not_panic() {
        let input = prepare(&RgbImage::new(64, 64), 0, 32);
        assert_eq!(input.letterbox.input_size, 32);
        assert_eq!(input.tensor.shape(), &[1, 3, 32, 32]);

        let (canvas, geometry) = letterbox(&RgbImage::new(10, 5), 0);
        assert_eq!(canvas.dimensions(), (1, 1));
        assert_eq!(geometry.input_size, 1);
    }

    #[test]
    fn test_letterbox_geometry() {
        let geometry = Letterbox::fit(1280, 640, 640);
        assert_eq!(geometry.gain, 0.5);
        assert_eq!(geometry.pad_x, 0);
        assert_eq!(geometry.pad_y, 160);
    }

    #[test]
    fn test_prepare_shape_and_range() {
        let image = RgbImage::from_fn(200, 100, |x, y| Rgb([(x % 256) as u8, (y * 2) as u8, 7]));
        let input = prepare(&image, 64, 32);
        assert_eq!(input.tensor.shape(), &[1, 3, 64, 64]);
        assert!(input.tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(input.letterbox.pad_y, 16);
        assert_eq!(
            input.tensor[[0, 0, 10, 10]],
            input.tensor[[0, 2, 10, 10]]
        );
    }
}
