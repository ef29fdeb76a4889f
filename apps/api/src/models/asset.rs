use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A generated artifact associated with a script, stored in the byte store at `s3_key`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScriptAssetRow {
    pub id: Uuid,
    pub script_id: Uuid,
    pub kind: String,
    pub s3_key: String,
    pub byte_size: i64,
    pub width: i32,
    pub height: i32,
    pub created_at: DateTime<Utc>,
}
