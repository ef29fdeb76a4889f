// Image asset pipeline: fetches every external artwork reference in a roster
// concurrently, recompresses it under a per-image byte budget, and embeds it as a
// data URI. Any per-image failure clears that reference; nothing here fails the
// request.

pub mod compress;
pub mod pipeline;
pub mod source;

use std::time::Duration;

use serde::Serialize;

pub use pipeline::{resolve_images, ImageKey, PipelineReport, ResolvedImages};
pub use source::{HttpImageSource, ImageSource};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedFormat {
    /// Lossless WebP. Preferred: keeps transparency around character tokens.
    WebP,
    /// Flattened onto white. Used when lossless cannot get under budget.
    Jpeg,
}

impl EmbedFormat {
    pub fn mime(self) -> &'static str {
        match self {
            EmbedFormat::WebP => "image/webp",
            EmbedFormat::Jpeg => "image/jpeg",
        }
    }
}

/// One rung of the recompression ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncodeStep {
    pub format: EmbedFormat,
    /// Longest side after downscaling. Images are never upscaled.
    pub max_dimension: u32,
    /// JPEG quality (1–100). Ignored for lossless formats.
    pub quality: u8,
}

/// Per-image byte budgets by roster size. Many embeds add up, so larger
/// rosters get smaller budgets.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetTiers {
    pub small_max_characters: usize,
    pub small_budget: usize,
    pub medium_max_characters: usize,
    pub medium_budget: usize,
    pub large_budget: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetConfig {
    /// Per-attempt timeout for one download.
    pub fetch_timeout: Duration,
    /// Total attempts per URL, first try included.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    /// Bound on the whole image phase of one request.
    pub phase_timeout: Duration,
    pub max_download_bytes: usize,
    pub budgets: BudgetTiers,
    pub encode_ladder: Vec<EncodeStep>,
}

fn step(format: EmbedFormat, max_dimension: u32, quality: u8) -> EncodeStep {
    EncodeStep {
        format,
        max_dimension,
        quality,
    }
}

pub fn default_asset_config() -> AssetConfig {
    AssetConfig {
        fetch_timeout: Duration::from_secs(8),
        max_attempts: 3,
        retry_backoff: Duration::from_millis(500),
        phase_timeout: Duration::from_secs(20),
        max_download_bytes: 5 * 1024 * 1024,
        budgets: BudgetTiers {
            small_max_characters: 12,
            small_budget: 48_000,
            medium_max_characters: 20,
            medium_budget: 24_000,
            large_budget: 12_000,
        },
        encode_ladder: vec![
            step(EmbedFormat::WebP, 256, 100),
            step(EmbedFormat::WebP, 192, 100),
            step(EmbedFormat::WebP, 128, 100),
            step(EmbedFormat::WebP, 96, 100),
            step(EmbedFormat::Jpeg, 160, 82),
            step(EmbedFormat::Jpeg, 128, 72),
            step(EmbedFormat::Jpeg, 96, 62),
            step(EmbedFormat::Jpeg, 72, 50),
        ],
    }
}

/// Byte budget for each embedded image in a roster of `total_characters`.
pub fn image_budget(total_characters: usize, tiers: &BudgetTiers) -> usize {
    if total_characters <= tiers.small_max_characters {
        tiers.small_budget
    } else if total_characters <= tiers.medium_max_characters {
        tiers.medium_budget
    } else {
        tiers.large_budget
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test fixtures
// ────────────────────────────────────────────────────────────────────────────
