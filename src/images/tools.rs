use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use super::PreviewError;

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub reject_upscale: bool,
}

// Decode, resize and re-encode a source image as JPEG
pub fn make_thumbnail(source: &[u8], params: &ResizeParams) -> Result<Vec<u8>, PreviewError> {
    let img = decode_image(source)?;

    if params.reject_upscale {
        check_bounds(&img, params.width, params.height)?;
    }

    let resized = resize_image(&img, params.width, params.height);
    encode_jpeg(&resized, params.quality)
}

pub fn decode_image(data: &[u8]) -> Result<DynamicImage, PreviewError> {
    image::load_from_memory(data).map_err(|e| PreviewError::DecodeFailed(e.to_string()))
}

fn check_bounds(img: &DynamicImage, width: u32, height: u32) -> Result<(), PreviewError> {
    let (source_width, source_height) = img.dimensions();

    if width > source_width || height > source_height {
        return Err(PreviewError::OutOfBounds {
            width,
            height,
            source_width,
            source_height,
        });
    }

    Ok(())
}

/// Scales to exactly `width` x `height`; the aspect ratio is not preserved.
pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    img.resize_exact(width, height, FilterType::Lanczos3)
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, PreviewError> {
    let mut output = Vec::new();

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));
    encoder
        .encode_image(&rgb)
        .map_err(|e| PreviewError::ResizeFailed(format!("JPEG encoding failed: {}", e)))?;

    Ok(output)
}
