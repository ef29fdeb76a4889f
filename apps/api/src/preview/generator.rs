//! Preview generation: one roster in, one SVG document out.
//!
//! Flow: parse_roster → classify_roster → extract_night_order →
//!       resolve_images (concurrent, time-bounded) → layout_preview →
//!       compose_svg → size ceiling check.
//!
//! Only two failures escape: a malformed roster (400) and a finished document
//! over the size ceiling (413). Every per-image problem degrades to a badge.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::assets::{resolve_images, ImageSource, PipelineReport};
use crate::errors::{human_size, AppError};
use crate::layout::{layout_preview, PreviewDocument};
use crate::models::roster::Faction;
use crate::preview::config::PreviewConfig;
use crate::render::compose_svg;
use crate::roster::{classify_roster, extract_night_order, parse_roster, ClassifiedRoster, NightOrderPlan};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Everything one generation pass produced, for the handlers to pick from.
#[derive(Debug, Clone)]
pub struct GeneratedPreview {
    pub svg: String,
    pub document: PreviewDocument,
    pub roster: ClassifiedRoster,
    pub night_order: NightOrderPlan,
    pub images: PipelineReport,
}

/// Header figures shown on the preview, exposed for inspection tooling.
#[derive(Debug, Clone, Serialize)]
pub struct RosterSummary {
    pub title: Option<String>,
    pub author: Option<String>,
    pub total_characters: usize,
    pub players: String,
    pub difficulty: String,
    pub faction_counts: Vec<FactionCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactionCount {
    pub faction: Faction,
    pub count: usize,
}

impl GeneratedPreview {
    pub fn summary(&self) -> RosterSummary {
        RosterSummary {
            title: self.roster.meta.title.clone(),
            author: self.roster.meta.author.clone(),
            total_characters: self.roster.total_characters,
            players: self.roster.players.label(),
            difficulty: self.roster.difficulty.label.clone(),
            faction_counts: self
                .roster
                .non_empty_factions()
                .into_iter()
                .map(|faction| FactionCount {
                    faction,
                    count: self.roster.count(faction),
                })
                .collect(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generation pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full generation pipeline for one raw roster body.
pub async fn generate_preview(
    body: &[u8],
    source: Arc<dyn ImageSource>,
    config: &PreviewConfig,
) -> Result<GeneratedPreview, AppError> {
    let document = parse_roster(body)?;
    let roster = classify_roster(document, &config.classifier);
    let night_order = extract_night_order(&roster);
    info!(
        "Roster classified: {} characters, {} first-night / {} other-night entries",
        roster.total_characters,
        night_order.first_night.len(),
        night_order.other_night.len()
    );

    let (images, report) = resolve_images(&roster, source, &config.assets).await;

    let layout = layout_preview(&roster, &night_order, &images, &config.layout);
    let svg = compose_svg(&layout, &config.layout);

    if svg.len() > config.max_document_bytes {
        warn!(
            "Preview for {} characters is {} bytes, over the {}-byte ceiling",
            roster.total_characters,
            svg.len(),
            config.max_document_bytes
        );
        return Err(AppError::PayloadTooLarge(format!(
            "Generated preview is {}, over the {} limit. Try fewer or smaller character images.",
            human_size(svg.len()),
            human_size(config.max_document_bytes)
        )));
    }

    info!(
        "Preview generated: {}x{} canvas, {} bytes, {} embedded images",
        layout.width,
        layout.height,
        svg.len(),
        images.len()
    );

    Ok(GeneratedPreview {
        svg,
        document: layout,
        roster,
        night_order,
        images: report,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
