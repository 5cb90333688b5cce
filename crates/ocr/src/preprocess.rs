use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// How a page photo is cleaned up before recognition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessOptions {
    /// Longest edge in pixels; larger photos are scaled down.
    pub max_dimension: u32,
    /// Pixels at or above this level become white, the rest black.
    /// `None` keeps the stretched grayscale.
    pub threshold: Option<u8>,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self { max_dimension: 2800, threshold: None }
    }
}

pub fn prepare_for_ocr(path: &Path, opts: &PreprocessOptions) -> Result<Vec<u8>, PreprocessError> {
    let img = image::open(path)?;
    encode_as_png(clean_page(img, opts))
}

/// Decode a phone photo (JPEG / PNG / …) and return cleaned PNG bytes.
pub fn prepare_for_ocr_from_bytes(
    data: &[u8],
    opts: &PreprocessOptions,
) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(clean_page(img, opts))
}

fn clean_page(img: DynamicImage, opts: &PreprocessOptions) -> DynamicImage {
    let max = opts.max_dimension.max(1);
    let img = if img.width() > max || img.height() > max {
        img.resize(max, max, FilterType::Lanczos3)
    } else {
        img
    };

    let mut page = stretch_contrast(img.to_luma8());
    if let Some(level) = opts.threshold {
        binarize(&mut page, level);
    }
    DynamicImage::ImageLuma8(page)
}

/// Map the darkest pixel to 0 and the brightest to 255.
fn stretch_contrast(mut gray: GrayImage) -> GrayImage {
    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if hi <= lo {
        return gray;
    }

    let range = u32::from(hi - lo);
    for p in gray.pixels_mut() {
        let v = u32::from(p[0] - lo) * 255 / range;
        *p = Luma([v as u8]);
    }
    gray
}

fn binarize(gray: &mut GrayImage, level: u8) {
    for p in gray.pixels_mut() {
        *p = Luma([if p[0] >= level { 255 } else { 0 }]);
    }
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
