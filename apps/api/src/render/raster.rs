//! On-demand rasterization of the SVG preview.
//!
//! Two tiers:
//! - **standard**: sharing-oriented JPEG, capped dimensions, never upscaled.
//! - **ultra**: print-oriented PNG at 3× density, never below the intrinsic size.
//!
//! Only an oversized input is an error. Every other failure (parse, allocation,
//! encode) falls back to the original SVG so callers always get something usable.

use std::sync::{Arc, OnceLock};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageError, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use usvg::fontdb;

use crate::assets::compress::flatten_onto_white;
use crate::render::composer::SVG_CONTENT_TYPE;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterTier {
    Standard,
    Ultra,
}

impl RasterTier {
    pub fn parse(raw: &str) -> Option<RasterTier> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(RasterTier::Standard),
            "ultra" => Some(RasterTier::Ultra),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RasterConfig {
    /// Inputs above this many bytes of SVG text are rejected outright.
    pub max_document_bytes: usize,
    pub standard_max_width: f32,
    pub standard_max_height: f32,
    pub standard_jpeg_quality: u8,
    /// Standard-tier JPEGs above this size are re-encoded at lower quality.
    pub standard_max_output_bytes: usize,
    /// Quality floor for that step-down; output may exceed the ceiling here.
    pub standard_min_jpeg_quality: u8,
    pub ultra_scale: f32,
    /// Largest pixel dimension the ultra tier will allocate.
    pub ultra_max_dimension: f32,
}

pub fn default_raster_config() -> RasterConfig {
    RasterConfig {
        max_document_bytes: 8 * 1024 * 1024,
        standard_max_width: 1200.0,
        standard_max_height: 3600.0,
        standard_jpeg_quality: 82,
        standard_max_output_bytes: 1024 * 1024,
        standard_min_jpeg_quality: 52,
        ultra_scale: 3.0,
        ultra_max_dimension: 16_384.0,
    }
}

const JPEG_QUALITY_STEP: u8 = 10;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("document is {size_bytes} bytes, over the {limit_bytes}-byte rasterization limit")]
    DocumentTooLarge {
        size_bytes: usize,
        limit_bytes: usize,
    },

    #[error("SVG parse failed: {0}")]
    Parse(#[from] usvg::Error),

    #[error("could not allocate a {width}x{height} pixmap")]
    Allocation { width: u32, height: u32 },

    #[error("encode failed: {0}")]
    Encode(#[from] ImageError),
}

#[derive(Debug, Clone)]
pub struct RasterOutput {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    /// Pixel size of the raster; zero on fallback.
    pub width: u32,
    pub height: u32,
    /// True when rasterization failed and `bytes` is the original SVG.
    pub fell_back: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Export
// ────────────────────────────────────────────────────────────────────────────

/// Rasterizes `svg` at `tier`. CPU-bound: run inside `spawn_blocking`.
///
/// Returns `Err` only for `DocumentTooLarge`.
pub fn export_raster(
    svg: &str,
    tier: RasterTier,
    config: &RasterConfig,
) -> Result<RasterOutput, RasterError> {
    if svg.len() > config.max_document_bytes {
        return Err(RasterError::DocumentTooLarge {
            size_bytes: svg.len(),
            limit_bytes: config.max_document_bytes,
        });
    }

    match rasterize(svg, tier, config) {
        Ok(output) => Ok(output),
        Err(e) => {
            warn!("Rasterization failed at {:?} tier, serving SVG instead: {e}", tier);
            Ok(RasterOutput {
                bytes: svg.as_bytes().to_vec(),
                content_type: SVG_CONTENT_TYPE,
                width: 0,
                height: 0,
                fell_back: true,
            })
        }
    }
}

/// Scale factor from SVG user units to output pixels.
pub fn target_scale(width: f32, height: f32, tier: RasterTier, config: &RasterConfig) -> f32 {
    match tier {
        RasterTier::Standard => 1.0_f32
            .min(config.standard_max_width / width)
            .min(config.standard_max_height / height),
        RasterTier::Ultra => {
            let largest = width.max(height);
            let scale = if largest * config.ultra_scale > config.ultra_max_dimension {
                config.ultra_max_dimension / largest
            } else {
                config.ultra_scale
            };
            scale.max(1.0)
        }
    }
}

fn rasterize(svg: &str, tier: RasterTier, config: &RasterConfig) -> Result<RasterOutput, RasterError> {
    let options = usvg::Options {
        fontdb: font_database(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &options)?;

    let size = tree.size();
    let scale = target_scale(size.width(), size.height(), tier, config);
    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;

    let mut pixmap = Pixmap::new(width, height).ok_or(RasterError::Allocation { width, height })?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; image expects straight alpha.
    let mut straight = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        straight.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let rgba =
        RgbaImage::from_raw(width, height, straight).ok_or(RasterError::Allocation { width, height })?;

    let mut bytes = Vec::new();
    let content_type = match tier {
        RasterTier::Standard => {
            let flat = flatten_onto_white(&rgba);
            let mut quality = config.standard_jpeg_quality;
            loop {
                bytes.clear();
                flat.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))?;
                if bytes.len() <= config.standard_max_output_bytes
                    || quality <= config.standard_min_jpeg_quality
                {
                    break;
                }
                debug!(
                    "Standard JPEG at q{} is {} bytes, over {}; stepping down",
                    quality,
                    bytes.len(),
                    config.standard_max_output_bytes
                );
                quality = quality
                    .saturating_sub(JPEG_QUALITY_STEP)
                    .max(config.standard_min_jpeg_quality);
            }
            if bytes.len() > config.standard_max_output_bytes {
                warn!(
                    "Standard JPEG still {} bytes at quality floor q{}",
                    bytes.len(),
                    quality
                );
            }
            "image/jpeg"
        }
        RasterTier::Ultra => {
            rgba.write_with_encoder(PngEncoder::new(&mut bytes))?;
            "image/png"
        }
    };

    debug!(
        "Rasterized {}x{} SVG to {}x{} {} ({} bytes)",
        size.width(),
        size.height(),
        width,
        height,
        content_type,
        bytes.len()
    );
    Ok(RasterOutput {
        bytes,
        content_type,
        width,
        height,
        fell_back: false,
    })
}

/// System fonts are scanned once per process.
fn font_database() -> Arc<fontdb::Database> {
    static FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            debug!("Loaded {} font faces for rasterization", db.len());
            Arc::new(db)
        })
        .clone()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
