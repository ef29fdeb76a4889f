//! The single immutable configuration value threaded through generation.
//!
//! Built once at startup (defaults plus env overrides) and shared as
//! `Arc<PreviewConfig>`. No component reads module-level mutable state.

use serde::Serialize;

use crate::assets::{default_asset_config, AssetConfig};
use crate::config::Config;
use crate::layout::{default_layout_config, LayoutConfig};
use crate::render::{default_raster_config, RasterConfig};
use crate::roster::classifier::default_classifier_config;
use crate::roster::ClassifierConfig;

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub classifier: ClassifierConfig,
    pub layout: LayoutConfig,
    pub assets: AssetConfig,
    pub raster: RasterConfig,
    /// Hard ceiling on the composed SVG. Larger documents are refused, never truncated.
    pub max_document_bytes: usize,
}

pub fn default_preview_config() -> PreviewConfig {
    PreviewConfig {
        classifier: default_classifier_config(),
        layout: default_layout_config(),
        assets: default_asset_config(),
        raster: default_raster_config(),
        max_document_bytes: 2 * 1024 * 1024,
    }
}

impl PreviewConfig {
    /// Defaults with the process-level overrides applied.
    pub fn from_app_config(config: &Config) -> Self {
        let mut preview = default_preview_config();
        preview.assets.fetch_timeout = config.image_fetch_timeout;
        preview.assets.phase_timeout = config.image_phase_timeout;
        preview.max_document_bytes = config.max_document_bytes;
        preview
    }

    pub fn summary(&self) -> PreviewConfigSummary {
        PreviewConfigSummary {
            canvas_width: self.layout.canvas_width,
            fetch_timeout_ms: self.assets.fetch_timeout.as_millis() as u64,
            phase_timeout_ms: self.assets.phase_timeout.as_millis() as u64,
            max_attempts: self.assets.max_attempts,
            max_document_bytes: self.max_document_bytes,
        }
    }
}

/// The handful of settings worth logging at startup.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewConfigSummary {
    pub canvas_width: f32,
    pub fetch_timeout_ms: u64,
    pub phase_timeout_ms: u64,
    pub max_attempts: u32,
    pub max_document_bytes: usize,
}
