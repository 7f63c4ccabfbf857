//! Image preprocessing: decode → resize → batch
//!
//! The model was exported expecting raw 0-255 RGB pixels in NHWC layout at
//! 224x224, resized with TensorFlow's classic bilinear rule.

use std::io::Cursor;

use image::{ImageError, ImageReader, Limits};
use ndarray::{Array3, Array4, ArrayBase, Axis, Data, Ix3};

use super::PredictionError;

/// Input edge length expected by the model
pub const INPUT_SIZE: usize = 224;

/// Colour channels expected by the model
pub const CHANNELS: usize = 3;

/// Largest accepted edge of a decoded image
pub const MAX_IMAGE_EDGE: u32 = 8192;

/// Decoder allocation ceiling; a small compressed upload may expand a lot
pub const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_EDGE);
    limits.max_image_height = Some(MAX_IMAGE_EDGE);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// Decode JPEG/PNG/GIF/BMP bytes into an (height, width, 3) RGB tensor.
///
/// Pixels stay `u8` at native size; only the resized tensor is `f32`.
pub fn decode(bytes: &[u8]) -> Result<Array3<u8>, PredictionError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::from)?;
    reader.limits(decode_limits());

    let rgb = reader.decode()?.to_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(Array3::from_shape_vec((height as usize, width as usize, CHANNELS), rgb.into_raw())?)
}

/// Source index pair and blend weight for one output coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    lower: usize,
    upper: usize,
    weight: f32,
}

fn axis_samples(input: usize, output: usize) -> Vec<Sample> {
    let scale = input as f32 / output as f32;
    (0..output)
        .map(|i| {
            let src = i as f32 * scale;
            let lower = (src.floor() as usize).min(input - 1);
            let upper = (lower + 1).min(input - 1);
            Sample {
                lower,
                upper,
                weight: src - lower as f32,
            }
        })
        .collect()
}

/// Bilinear resize without corner alignment or half-pixel centers.
///
/// Channel order is preserved and values are not rounded.
pub fn resize_bilinear<S, A>(image: &ArrayBase<S, Ix3>, out_height: usize, out_width: usize) -> Array3<f32>
where
    S: Data<Elem = A>,
    A: Copy + Into<f32>,
{
    let (in_height, in_width, channels) = image.dim();
    let rows = axis_samples(in_height, out_height);
    let cols = axis_samples(in_width, out_width);

    Array3::from_shape_fn((out_height, out_width, channels), |(y, x, c)| {
        let r = rows[y];
        let k = cols[x];

        let top_left: f32 = image[[r.lower, k.lower, c]].into();
        let top_right: f32 = image[[r.lower, k.upper, c]].into();
        let bottom_left: f32 = image[[r.upper, k.lower, c]].into();
        let bottom_right: f32 = image[[r.upper, k.upper, c]].into();

        let top = top_left + (top_right - top_left) * k.weight;
        let bottom = bottom_left + (bottom_right - bottom_left) * k.weight;
        top + (bottom - top) * r.weight
    })
}

/// Prepend a batch axis of size 1
pub fn batch(image: Array3<f32>) -> Array4<f32> {
    image.insert_axis(Axis(0))
}

/// Full preprocessing: bytes → (1, 224, 224, 3)
pub fn to_model_input(bytes: &[u8]) -> Result<Array4<f32>, PredictionError> {
    let decoded = decode(bytes)?;
    let resized = resize_bilinear(&decoded, INPUT_SIZE, INPUT_SIZE);
    Ok(batch(resized))
}
