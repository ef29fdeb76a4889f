//! Axum route handlers for the Preview API.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::assets::PipelineReport;
use crate::errors::AppError;
use crate::layout::PreviewDocument;
use crate::preview::generator::{generate_preview, GeneratedPreview, RosterSummary};
use crate::preview::storage::{load_latest_preview, persist_in_background, PersistParams};
use crate::render::{export_raster, RasterTier, SVG_CONTENT_TYPE};
use crate::roster::NightOrderPlan;
use crate::state::AppState;

/// Set on raster responses that had to fall back to the SVG.
pub const FALLBACK_HEADER: &str = "x-preview-fallback";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TierQuery {
    pub tier: Option<String>,
}

impl TierQuery {
    fn parse(&self) -> Result<Option<RasterTier>, AppError> {
        match self.tier.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => RasterTier::parse(raw).map(Some).ok_or_else(|| {
                AppError::Validation(format!(
                    "Unknown raster tier '{raw}', expected 'standard' or 'ultra'"
                ))
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LayoutInspectionResponse {
    pub summary: RosterSummary,
    pub night_order: NightOrderPlan,
    pub document: PreviewDocument,
    pub images: PipelineReport,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/preview
///
/// Body is the raw roster JSON. Returns the SVG document.
pub async fn handle_preview(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let preview = generate(&state, &body).await?;
    Ok(svg_response(preview.svg))
}

/// POST /api/v1/preview/raster?tier=standard|ultra
///
/// Missing tier means standard.
pub async fn handle_preview_raster(
    State(state): State<AppState>,
    Query(query): Query<TierQuery>,
    body: Bytes,
) -> Result<Response, AppError> {
    let tier = query.parse()?.unwrap_or(RasterTier::Standard);
    let preview = generate(&state, &body).await?;
    rasterize(&state, preview.svg, tier).await
}

/// POST /api/v1/preview/layout
///
/// Classification summary, night order and laid-out primitives as JSON.
pub async fn handle_preview_layout(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LayoutInspectionResponse>, AppError> {
    let preview = generate(&state, &body).await?;
    Ok(Json(LayoutInspectionResponse {
        summary: preview.summary(),
        night_order: preview.night_order,
        document: preview.document,
        images: preview.images,
    }))
}

/// POST /api/v1/scripts/:script_id/preview
///
/// Generates and returns the SVG; storage happens in the background and
/// never affects the response.
pub async fn handle_generate_script_preview(
    State(state): State<AppState>,
    Path(script_id): Path<Uuid>,
    body: Bytes,
) -> Result<Response, AppError> {
    let preview = generate(&state, &body).await?;

    persist_in_background(
        state.db.clone(),
        state.s3.clone(),
        state.config.s3_bucket.clone(),
        PersistParams {
            script_id,
            svg: preview.svg.clone(),
            width: preview.document.width,
            height: preview.document.height,
        },
    );

    Ok(svg_response(preview.svg))
}

/// GET /api/v1/scripts/:script_id/preview?tier=
///
/// Latest stored preview. With a tier, rasterized on demand.
pub async fn handle_get_script_preview(
    State(state): State<AppState>,
    Path(script_id): Path<Uuid>,
    Query(query): Query<TierQuery>,
) -> Result<Response, AppError> {
    let tier = query.parse()?;
    let (row, svg) = load_latest_preview(&state.db, &state.s3, &state.config.s3_bucket, script_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No preview stored for script {script_id}")))?;

    info!("Serving stored preview {} for script {}", row.id, script_id);
    match tier {
        Some(tier) => rasterize(&state, svg, tier).await,
        None => Ok(svg_response(svg)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn generate(state: &AppState, body: &[u8]) -> Result<GeneratedPreview, AppError> {
    if body.is_empty() {
        return Err(AppError::Validation("Request body must contain a roster".to_string()));
    }
    generate_preview(body, state.image_source.clone(), &state.preview).await
}

async fn rasterize(state: &AppState, svg: String, tier: RasterTier) -> Result<Response, AppError> {
    let preview = state.preview.clone();
    let output = tokio::task::spawn_blocking(move || export_raster(&svg, tier, &preview.raster))
        .await
        .map_err(anyhow::Error::from)??;

    let fallback = if output.fell_back {
        "svg"
    } else {
        info!(
            "Rasterized preview at {:?} tier: {}x{}, {} bytes",
            tier,
            output.width,
            output.height,
            output.bytes.len()
        );
        "none"
    };
    Ok((
        [
            (header::CONTENT_TYPE, output.content_type),
            (header::HeaderName::from_static(FALLBACK_HEADER), fallback),
        ],
        output.bytes,
    )
        .into_response())
}

fn svg_response(svg: String) -> Response {
    ([(header::CONTENT_TYPE, SVG_CONTENT_TYPE)], svg).into_response()
}
