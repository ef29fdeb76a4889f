use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::assets::ImageSource;
use crate::config::Config;
use crate::preview::PreviewConfig;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub config: Config,
    /// Immutable rendering constants, built once at startup.
    pub preview: Arc<PreviewConfig>,
    /// Pluggable image transport. Default: HttpImageSource.
    pub image_source: Arc<dyn ImageSource>,
}
