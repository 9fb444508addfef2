use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat};
use ny_core::{Error, ImageFormat, Result, Transcoder};

/// Quality used for lossy formats unless configured otherwise.
pub const DEFAULT_QUALITY: u8 = 75;

/// Decodes whatever the image crate understands and re-encodes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTranscoder;

impl Transcoder for ImageTranscoder {
    fn transcode(&self, raw: &[u8], target: ImageFormat, quality: u8) -> Result<Vec<u8>> {
        let decoded = image::load_from_memory(raw)
            .map_err(|e| Error::TranscodeFailed(format!("could not decode image: {}", e)))?;

        match target {
            ImageFormat::WebP => {
                // libwebp only takes 8-bit RGB(A).
                let rgba = match decoded {
                    DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => decoded,
                    other => DynamicImage::ImageRgba8(other.to_rgba8()),
                };
                let encoder = webp::Encoder::from_image(&rgba)
                    .map_err(|e| Error::TranscodeFailed(format!("could not encode webp: {}", e)))?;
                Ok(encoder.encode(f32::from(quality.min(100))).to_vec())
            }
            ImageFormat::Jpeg => encode(
                &DynamicImage::ImageRgb8(decoded.to_rgb8()),
                ImageOutputFormat::Jpeg(quality.clamp(1, 100)),
            ),
            ImageFormat::Png => encode(&decoded, ImageOutputFormat::Png),
        }
    }
}

fn encode(image: &DynamicImage, format: ImageOutputFormat) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, format)
        .map_err(|e| Error::TranscodeFailed(e.to_string()))?;
    Ok(buffer.into_inner())
}
