use image::{DynamicImage, Rgb, RgbImage};
use ndarray::Array4;

use super::model::InferenceError;

/// Side length the model was trained on.
pub const INPUT_SIZE: u32 = 150;
pub const INPUT_CHANNELS: usize = 3;

pub fn decode_image(image_bytes: &[u8]) -> Result<DynamicImage, InferenceError> {
    Ok(image::load_from_memory(image_bytes)?)
}

/// Builds the `(1, 150, 150, 3)` NHWC input: BGR channel order, values in `[0, 1]`.
///
/// Any color type is flattened to 8-bit RGB first, so grayscale and RGBA
/// scans are accepted and alpha is dropped.
pub fn preprocess_image(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let resized = resize_bilinear(&rgb, INPUT_SIZE, INPUT_SIZE);
    let size = INPUT_SIZE as usize;

    Array4::from_shape_fn((1, size, size, INPUT_CHANNELS), |(_, y, x, c)| {
        let pixel = resized.get_pixel(x as u32, y as u32);
        // c = 0 is blue, 2 is red
        f32::from(pixel[INPUT_CHANNELS - 1 - c]) / 255.0
    })
}

/// Source coordinate and weight of the right/lower neighbour for one output
/// index, using half-pixel centres. Edges clamp to the border pixel.
fn source_sample(dst: u32, scale: f32, src_len: u32) -> (u32, f32) {
    let pos = (dst as f32 + 0.5) * scale - 0.5;
    let base = pos.floor();
    if base < 0.0 {
        return (0, 0.0);
    }
    let index = base as u32;
    if index + 1 >= src_len {
        return (src_len - 1, 0.0);
    }
    (index, pos - base)
}

/// Plain bilinear resize over the 2x2 neighbourhood. Unlike
/// `FilterType::Triangle` the kernel does not widen when shrinking, which
/// matches the interpolation the model was trained with.
pub fn resize_bilinear(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 {
        return RgbImage::new(width, height);
    }
    let scale_x = src_w as f32 / width as f32;
    let scale_y = src_h as f32 / height as f32;

    RgbImage::from_fn(width, height, |x, y| {
        let (x0, wx) = source_sample(x, scale_x, src_w);
        let (y0, wy) = source_sample(y, scale_y, src_h);
        let x1 = (x0 + 1).min(src_w - 1);
        let y1 = (y0 + 1).min(src_h - 1);

        let (tl, tr) = (src.get_pixel(x0, y0), src.get_pixel(x1, y0));
        let (bl, br) = (src.get_pixel(x0, y1), src.get_pixel(x1, y1));
        let mut out = [0u8; 3];
        for (c, value) in out.iter_mut().enumerate() {
            let top = f32::from(tl[c]) * (1.0 - wx) + f32::from(tr[c]) * wx;
            let bottom = f32::from(bl[c]) * (1.0 - wx) + f32::from(br[c]) * wx;
            *value = (top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}
