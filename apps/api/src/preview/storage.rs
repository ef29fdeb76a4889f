//! Persistence of generated previews: SVG bytes in the object store, one
//! `script_assets` row per generation.
//!
//! Append-only: every generation gets a fresh asset id and key. Readers take the
//! newest row for a script.

use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::asset::ScriptAssetRow;
use crate::render::SVG_CONTENT_TYPE;

pub const PREVIEW_ASSET_KIND: &str = "preview_svg";

/// Parameters for recording one generated preview.
pub struct PersistParams {
    pub script_id: Uuid,
    pub svg: String,
    pub width: f32,
    pub height: f32,
}

pub fn preview_key(script_id: Uuid, asset_id: Uuid) -> String {
    format!("scripts/{script_id}/preview/{asset_id}.svg")
}

/// Uploads the SVG, then records the asset row.
///
/// The row is only written after the upload succeeds, so every row points at
/// an object that exists.
pub async fn persist_preview(
    pool: &PgPool,
    s3: &aws_sdk_s3::Client,
    s3_bucket: &str,
    params: PersistParams,
) -> Result<ScriptAssetRow> {
    let PersistParams {
        script_id,
        svg,
        width,
        height,
    } = params;

    let asset_id = Uuid::new_v4();
    let s3_key = preview_key(script_id, asset_id);
    let byte_size = svg.len() as i64;

    // 1. Upload document
    s3.put_object()
        .bucket(s3_bucket)
        .key(&s3_key)
        .body(ByteStream::from(svg.into_bytes()))
        .content_type(SVG_CONTENT_TYPE)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

    info!("Uploaded preview to s3://{}/{}", s3_bucket, s3_key);

    // 2. Record asset
    let row = sqlx::query_as::<_, ScriptAssetRow>(
        r#"
        INSERT INTO script_assets (id, script_id, kind, s3_key, byte_size, width, height)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(asset_id)
    .bind(script_id)
    .bind(PREVIEW_ASSET_KIND)
    .bind(&s3_key)
    .bind(byte_size)
    .bind(width.round() as i32)
    .bind(height.round() as i32)
    .fetch_one(pool)
    .await?;

    info!("Recorded preview asset {asset_id} for script {script_id}");
    Ok(row)
}

/// Persists on a background task. Failures are logged and never reach the
/// request that produced the preview.
pub fn persist_in_background(
    pool: PgPool,
    s3: aws_sdk_s3::Client,
    s3_bucket: String,
    params: PersistParams,
) {
    tokio::spawn(async move {
        let script_id = params.script_id;
        if let Err(e) = persist_preview(&pool, &s3, &s3_bucket, params).await {
            error!("Failed to persist preview for script {script_id}: {e:?}");
        }
    });
}

/// Fetches the newest stored preview for a script, if any.
pub async fn load_latest_preview(
    pool: &PgPool,
    s3: &aws_sdk_s3::Client,
    s3_bucket: &str,
    script_id: Uuid,
) -> Result<Option<(ScriptAssetRow, String)>, AppError> {
    let row = sqlx::query_as::<_, ScriptAssetRow>(
        r#"
        SELECT * FROM script_assets
        WHERE script_id = $1 AND kind = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(script_id)
    .bind(PREVIEW_ASSET_KIND)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let object = s3
        .get_object()
        .bucket(s3_bucket)
        .key(&row.s3_key)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 download of {} failed: {e}", row.s3_key)))?;
    let bytes = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::Storage(format!("S3 body read of {} failed: {e}", row.s3_key)))?
        .into_bytes();
    let svg = String::from_utf8(bytes.to_vec())
        .map_err(|e| AppError::Storage(format!("Stored preview {} is not UTF-8: {e}", row.s3_key)))?;

    Ok(Some((row, svg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_key_layout() {
        let script = Uuid::parse_str("6f1c2f0e-2c55-4c8e-9a53-0c0d9e1b7a10").unwrap();
        let asset = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
        assert_eq!(
            preview_key(script, asset),
            "scripts/6f1c2f0e-2c55-4c8e-9a53-0c0d9e1b7a10/preview/00000000-0000-0000-0000-000000000001.svg"
        );
    }
}
