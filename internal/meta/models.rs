use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Chunk-0 row of an object: all object metadata lives here so listings
/// stay single-row per key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ObjectHead {
    pub bucket: String,
    pub key: String,
    pub size: i64,
    pub etag: String,
    pub last_modified: String,
    pub content_type: String,
    pub depth: i64,
    pub parent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MultipartUpload {
    pub upload_id: String,
    pub bucket: String,
    pub key: String,
    pub created_at: String,
    pub content_type: String,
}

/// Chunk-0 row of one uploaded part.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PartHead {
    pub part_number: i64,
    pub size: i64,
    pub etag: String,
}
