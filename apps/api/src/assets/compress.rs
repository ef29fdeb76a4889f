//! Budget-constrained recompression of downloaded artwork.
//!
//! CPU-bound: callers run `compress_to_budget` inside `tokio::task::spawn_blocking`.

use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, Rgb, RgbImage, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::assets::{EmbedFormat, EncodeStep};

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("content is not a recognized image format")]
    UnknownFormat,

    #[error("image decode failed: {0}")]
    Decode(#[from] ImageError),
}

/// Bytes ready to be inlined into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPayload {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

impl EmbeddedPayload {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub payload: EmbeddedPayload,
    pub within_budget: bool,
    /// Sizes of every candidate considered, the original first.
    pub attempts: Vec<usize>,
}

/// Shrinks `original` to at most `budget` bytes if the ladder allows it.
///
/// The original is returned untouched when it already fits. Otherwise the first
/// ladder rung that fits wins; if none fits, the smallest candidate seen
/// (the original included) is returned with `within_budget = false`. The result
/// is never larger than `original`.
///
/// Content that does not decode as an image is an error, whatever it claimed to be.
pub fn compress_to_budget(
    original: &[u8],
    budget: usize,
    ladder: &[EncodeStep],
) -> Result<CompressionOutcome, CompressError> {
    let format = image::guess_format(original).map_err(|_| CompressError::UnknownFormat)?;
    let decoded = image::load_from_memory_with_format(original, format)?;

    let mut attempts = vec![original.len()];
    let mut best = EmbeddedPayload {
        bytes: original.to_vec(),
        mime: format.to_mime_type(),
    };
    if original.len() <= budget {
        return Ok(CompressionOutcome {
            payload: best,
            within_budget: true,
            attempts,
        });
    }

    for step in ladder {
        let encoded = match encode_step(&decoded, step) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Skipping {:?} encode at {}px: {e}", step.format, step.max_dimension);
                continue;
            }
        };
        attempts.push(encoded.len());
        let candidate = EmbeddedPayload {
            bytes: encoded,
            mime: step.format.mime(),
        };
        if candidate.bytes.len() <= budget {
            return Ok(CompressionOutcome {
                payload: candidate,
                within_budget: true,
                attempts,
            });
        }
        if candidate.bytes.len() < best.bytes.len() {
            best = candidate;
        }
    }

    Ok(CompressionOutcome {
        payload: best,
        within_budget: false,
        attempts,
    })
}

fn encode_step(img: &DynamicImage, step: &EncodeStep) -> Result<Vec<u8>, ImageError> {
    let scaled = if img.width() > step.max_dimension || img.height() > step.max_dimension {
        Cow::Owned(img.resize(step.max_dimension, step.max_dimension, FilterType::Triangle))
    } else {
        Cow::Borrowed(img)
    };

    let mut buf = Vec::new();
    match step.format {
        EmbedFormat::WebP => scaled
            .to_rgba8()
            .write_with_encoder(WebPEncoder::new_lossless(&mut buf))?,
        EmbedFormat::Jpeg => flatten_onto_white(&scaled.to_rgba8()).write_with_encoder(
            JpegEncoder::new_with_quality(&mut buf, step.quality.clamp(1, 100)),
        )?,
    }
    Ok(buf)
}

/// Composites straight-alpha RGBA over an opaque white background.
pub(crate) fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u16;
        let blend = |c: u8| ((c as u16 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::default_asset_config;
    use crate::assets::test_support::{flat_png, noisy_png};

    #[test]
    fn test_small_image_returned_untouched() {
        let png = flat_png(8, 8);
        let ladder = default_asset_config().encode_ladder;
        let outcome = compress_to_budget(&png, 48_000, &ladder).unwrap();
        assert!(outcome.within_budget);
        assert_eq!(outcome.payload.bytes, png);
        assert_eq!(outcome.payload.mime, "image/png");
        assert_eq!(outcome.attempts, vec![png.len()]);
    }

    #[test]
    fn test_large_image_brought_under_budget() {
        let png = noisy_png(300, 300);
        let ladder = default_asset_config().encode_ladder;
        let outcome = compress_to_budget(&png, 12_000, &ladder).unwrap();
        assert!(outcome.within_budget, "attempts: {:?}", outcome.attempts);
        assert!(outcome.payload.bytes.len() <= 12_000);
        assert!(outcome.payload.bytes.len() <= png.len());
        assert!(outcome.attempts.len() > 1);
    }

    #[test]
    fn test_budget_miss_returns_smallest_candidate() {
        let png = noisy_png(200, 200);
        let ladder = default_asset_config().encode_ladder;
        let outcome = compress_to_budget(&png, 1, &ladder).unwrap();
        assert!(!outcome.within_budget);
        assert_eq!(outcome.attempts.len(), ladder.len() + 1);
        let smallest = *outcome.attempts.iter().min().unwrap();
        assert_eq!(outcome.payload.bytes.len(), smallest);
        assert!(outcome.payload.bytes.len() <= png.len());
    }

    #[test]
    fn test_budget_miss_with_empty_ladder_keeps_original() {
        let png = noisy_png(64, 64);
        let outcome = compress_to_budget(&png, 1, &[]).unwrap();
        assert!(!outcome.within_budget);
        assert_eq!(outcome.payload.bytes, png);
    }

    #[test]
    fn test_non_image_content_is_an_error() {
        let ladder = default_asset_config().encode_ladder;
        assert!(matches!(
            compress_to_budget(b"<html>not an image</html>", 1_000, &ladder),
            Err(CompressError::UnknownFormat)
        ));
        // Valid PNG signature, truncated body.
        let mut png = flat_png(16, 16);
        png.truncate(20);
        assert!(compress_to_budget(&png, 1, &ladder).is_err());
    }

    #[test]
    fn test_data_uri_shape() {
        let payload = EmbeddedPayload {
            bytes: vec![0xff, 0xd8, 0xff],
            mime: "image/jpeg",
        };
        assert_eq!(payload.data_uri(), "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_flatten_blends_transparent_pixels_to_white() {
        let rgba = RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 0]));
        assert_eq!(flatten_onto_white(&rgba).get_pixel(0, 0).0, [255, 255, 255]);
        let rgba = RgbaImage::from_pixel(1, 1, image::Rgba([10, 20, 30, 255]));
        assert_eq!(flatten_onto_white(&rgba).get_pixel(0, 0).0, [10, 20, 30]);
    }
}
