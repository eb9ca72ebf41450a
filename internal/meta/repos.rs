use crate::meta::keypath;
use crate::meta::models::{MultipartUpload, ObjectHead, PartHead};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

/// One row holds at most this many object bytes; chosen well under the
/// storage engine's row-size cap.
pub const CHUNK_SIZE: usize = 1024 * 1024;

const HEAD_COLUMNS: &str =
    "bucket, key, size, etag, last_modified, content_type, depth, parent";

type SqliteTx<'a> = Transaction<'a, Sqlite>;

/// A fully buffered object about to replace whatever lives at
/// `(bucket, key)`.
pub struct ObjectWrite<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
    pub etag: &'a str,
    pub content_type: &'a str,
    pub last_modified: &'a str,
    pub data: &'a [u8],
}

pub struct CopiedObject {
    pub size: i64,
    pub etag: String,
    pub content_type: String,
}

pub struct UploadListFilter<'a> {
    pub bucket: &'a str,
    pub prefix: &'a str,
    pub key_marker: Option<&'a str>,
    pub upload_id_marker: Option<&'a str>,
}

#[derive(Clone)]
#[derive(Debug)]
pub struct Repo {
    pool: SqlitePool,
}

impl Repo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_object_head(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ObjectHead>, sqlx::Error> {
        sqlx::query_as::<_, ObjectHead>(&format!(
            "SELECT {HEAD_COLUMNS} FROM objects \
             WHERE bucket = ? AND key = ? AND chunk_index = 0"
        ))
        .bind(bucket)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
    }

    /// Concatenates every chunk in ascending order. `None` when no row
    /// exists for the key.
    pub async fn get_object_data(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, sqlx::Error> {
        let rows: Vec<(Vec<u8>,)> = sqlx::query_as(
            "SELECT data FROM objects WHERE bucket = ? AND key = ? ORDER BY chunk_index",
        )
        .bind(bucket)
        .bind(key)
        .fetch_all(&self.pool)
        .await?;
        if rows.is_empty() {
            return Ok(None);
        }
        let mut body = Vec::new();
        for (chunk,) in rows {
            body.extend_from_slice(&chunk);
        }
        Ok(Some(body))
    }

    pub async fn put_object(&self, write: &ObjectWrite<'_>) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        delete_object_rows(&mut tx, write.bucket, write.key).await?;
        insert_object_chunks(&mut tx, write).await?;
        tx.commit().await
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM objects WHERE bucket = ? AND key = ?")
            .bind(bucket)
            .bind(key)
            .execute(&self.pool)
            .await
            .map(|_| ())
    }

    /// Copies every chunk of `src_key` to `dst_key`, replacing the
    /// destination. Chunk 0 keeps the source size/etag/content-type and
    /// takes a fresh timestamp plus the destination's depth/parent.
    /// `None` when the source does not exist.
    pub async fn copy_object(
        &self,
        bucket: &str,
        src_key: &str,
        dst_key: &str,
        last_modified: &str,
    ) -> Result<Option<CopiedObject>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let head = sqlx::query_as::<_, ObjectHead>(&format!(
            "SELECT {HEAD_COLUMNS} FROM objects \
             WHERE bucket = ? AND key = ? AND chunk_index = 0"
        ))
        .bind(bucket)
        .bind(src_key)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(head) = head else {
            return Ok(None);
        };
        // Source chunks are read before the destination delete so copying a
        // key onto itself stays well-defined.
        let chunks: Vec<(i64, Vec<u8>)> = sqlx::query_as(
            "SELECT chunk_index, data FROM objects \
             WHERE bucket = ? AND key = ? ORDER BY chunk_index",
        )
        .bind(bucket)
        .bind(src_key)
        .fetch_all(&mut *tx)
        .await?;
        delete_object_rows(&mut tx, bucket, dst_key).await?;
        for (chunk_index, data) in chunks {
            if chunk_index == 0 {
                insert_head_chunk(
                    &mut tx,
                    bucket,
                    dst_key,
                    head.size,
                    &head.etag,
                    last_modified,
                    &head.content_type,
                    &data,
                )
                .await?;
            } else {
                insert_tail_chunk(&mut tx, bucket, dst_key, chunk_index, &data).await?;
            }
        }
        tx.commit().await?;
        Ok(Some(CopiedObject {
            size: head.size,
            etag: head.etag,
            content_type: head.content_type,
        }))
    }

    pub async fn create_multipart_upload(
        &self,
        upload_id: &str,
        bucket: &str,
        key: &str,
        content_type: &str,
        created_at: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO multipart_uploads (upload_id, bucket, key, created_at, content_type) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(upload_id)
        .bind(bucket)
        .bind(key)
        .bind(created_at)
        .bind(content_type)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }

    pub async fn get_multipart_upload(
        &self,
        upload_id: &str,
    ) -> Result<Option<MultipartUpload>, sqlx::Error> {
        sqlx::query_as::<_, MultipartUpload>(
            "SELECT upload_id, bucket, key, created_at, content_type \
             FROM multipart_uploads WHERE upload_id = ?",
        )
        .bind(upload_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Stores one part, replacing any prior upload of the same part number.
    pub async fn put_part(
        &self,
        upload_id: &str,
        part_number: i64,
        etag: &str,
        data: &[u8],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM multipart_parts WHERE upload_id = ? AND part_number = ?")
            .bind(upload_id)
            .bind(part_number)
            .execute(&mut *tx)
            .await?;
        insert_part_chunks(&mut tx, upload_id, part_number, etag, data).await?;
        tx.commit().await
    }

    pub async fn list_part_heads(&self, upload_id: &str) -> Result<Vec<PartHead>, sqlx::Error> {
        sqlx::query_as::<_, PartHead>(
            "SELECT part_number, size, etag FROM multipart_parts \
             WHERE upload_id = ? AND chunk_index = 0 ORDER BY part_number",
        )
        .bind(upload_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Materializes a completed upload: concatenates every part's chunks in
    /// `(part_number, chunk_index)` order, replaces the object at the
    /// session's key with a densely re-chunked sequence, and purges the
    /// session — all in one transaction. Returns the assembled size.
    pub async fn assemble_upload(
        &self,
        upload: &MultipartUpload,
        etag: &str,
        last_modified: &str,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let chunks: Vec<(Vec<u8>,)> = sqlx::query_as(
            "SELECT data FROM multipart_parts WHERE upload_id = ? \
             ORDER BY part_number, chunk_index",
        )
        .bind(&upload.upload_id)
        .fetch_all(&mut *tx)
        .await?;
        let mut body = Vec::new();
        for (chunk,) in chunks {
            body.extend_from_slice(&chunk);
        }
        delete_object_rows(&mut tx, &upload.bucket, &upload.key).await?;
        let write = ObjectWrite {
            bucket: &upload.bucket,
            key: &upload.key,
            etag,
            content_type: &upload.content_type,
            last_modified,
            data: &body,
        };
        insert_object_chunks(&mut tx, &write).await?;
        delete_upload_rows(&mut tx, &upload.upload_id).await?;
        tx.commit().await?;
        Ok(body.len() as i64)
    }

    pub async fn abort_multipart_upload(&self, upload_id: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        delete_upload_rows(&mut tx, upload_id).await?;
        tx.commit().await
    }

    /// Sessions for a bucket ordered by `(key, upload_id)`. The prefix is a
    /// half-open key range; the marker pair skips past an exact
    /// `(key, upload_id)`, a bare key marker skips past the key.
    pub async fn list_multipart_uploads(
        &self,
        filter: &UploadListFilter<'_>,
        limit: i64,
    ) -> Result<Vec<MultipartUpload>, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT upload_id, bucket, key, created_at, content_type \
             FROM multipart_uploads WHERE bucket = ",
        );
        builder.push_bind(filter.bucket);
        if !filter.prefix.is_empty() {
            builder.push(" AND key >= ").push_bind(filter.prefix);
            if let Some(upper) = keypath::prefix_upper_bound(filter.prefix) {
                builder.push(" AND key < ").push_bind(upper);
            }
        }
        match (filter.key_marker, filter.upload_id_marker) {
            (Some(key_marker), Some(upload_id_marker)) => {
                builder
                    .push(" AND (key > ")
                    .push_bind(key_marker)
                    .push(" OR (key = ")
                    .push_bind(key_marker)
                    .push(" AND upload_id > ")
                    .push_bind(upload_id_marker)
                    .push("))");
            }
            (Some(key_marker), None) => {
                builder.push(" AND key > ").push_bind(key_marker);
            }
            _ => {}
        }
        builder.push(" ORDER BY key, upload_id LIMIT ").push_bind(limit);
        builder
            .build_query_as::<MultipartUpload>()
            .fetch_all(&self.pool)
            .await
    }

    /// Chunk-0 rows whose `parent` equals `parent` exactly — the direct
    /// children used by the slash-delimiter fast path.
    pub async fn list_child_heads(
        &self,
        bucket: &str,
        parent: &str,
        marker: &str,
        limit: i64,
    ) -> Result<Vec<ObjectHead>, sqlx::Error> {
        sqlx::query_as::<_, ObjectHead>(&format!(
            "SELECT {HEAD_COLUMNS} FROM objects \
             WHERE bucket = ? AND chunk_index = 0 AND parent = ? AND key > ? \
             ORDER BY key LIMIT ?"
        ))
        .bind(bucket)
        .bind(parent)
        .bind(marker)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Distinct `parent` values within `[lower, upper)` past the marker.
    /// Callers post-filter for the target depth; the range keeps `%`/`_`
    /// literal.
    pub async fn list_distinct_parents(
        &self,
        bucket: &str,
        lower: &str,
        upper: Option<&str>,
        marker: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT DISTINCT parent FROM objects WHERE bucket = ",
        );
        builder.push_bind(bucket);
        builder.push(" AND chunk_index = 0 AND parent >= ").push_bind(lower);
        if let Some(upper) = upper {
            builder.push(" AND parent < ").push_bind(upper);
        }
        builder.push(" AND parent > ").push_bind(marker);
        builder.push(" ORDER BY parent");
        builder
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await
    }

    /// Chunk-0 rows in key order within `[lower, upper)` past the marker.
    pub async fn list_key_range(
        &self,
        bucket: &str,
        lower: &str,
        upper: Option<&str>,
        marker: &str,
        limit: i64,
    ) -> Result<Vec<ObjectHead>, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {HEAD_COLUMNS} FROM objects WHERE bucket = "
        ));
        builder.push_bind(bucket);
        builder.push(" AND chunk_index = 0 AND key >= ").push_bind(lower);
        if let Some(upper) = upper {
            builder.push(" AND key < ").push_bind(upper);
        }
        builder.push(" AND key > ").push_bind(marker);
        builder.push(" ORDER BY key LIMIT ").push_bind(limit);
        builder
            .build_query_as::<ObjectHead>()
            .fetch_all(&self.pool)
            .await
    }
}

async fn delete_object_rows(
    tx: &mut SqliteTx<'_>,
    bucket: &str,
    key: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM objects WHERE bucket = ? AND key = ?")
        .bind(bucket)
        .bind(key)
        .execute(&mut **tx)
        .await
        .map(|_| ())
}

async fn delete_upload_rows(tx: &mut SqliteTx<'_>, upload_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM multipart_parts WHERE upload_id = ?")
        .bind(upload_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM multipart_uploads WHERE upload_id = ?")
        .bind(upload_id)
        .execute(&mut **tx)
        .await
        .map(|_| ())
}

async fn insert_object_chunks(
    tx: &mut SqliteTx<'_>,
    write: &ObjectWrite<'_>,
) -> Result<(), sqlx::Error> {
    let head_len = write.data.len().min(CHUNK_SIZE);
    insert_head_chunk(
        tx,
        write.bucket,
        write.key,
        write.data.len() as i64,
        write.etag,
        write.last_modified,
        write.content_type,
        &write.data[..head_len],
    )
    .await?;
    let mut chunk_index = 1i64;
    let mut offset = CHUNK_SIZE;
    while offset < write.data.len() {
        let end = (offset + CHUNK_SIZE).min(write.data.len());
        insert_tail_chunk(tx, write.bucket, write.key, chunk_index, &write.data[offset..end])
            .await?;
        chunk_index += 1;
        offset = end;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn insert_head_chunk(
    tx: &mut SqliteTx<'_>,
    bucket: &str,
    key: &str,
    size: i64,
    etag: &str,
    last_modified: &str,
    content_type: &str,
    data: &[u8],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO objects \
         (bucket, key, chunk_index, size, etag, last_modified, content_type, data, depth, parent) \
         VALUES (?, ?, 0, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(bucket)
    .bind(key)
    .bind(size)
    .bind(etag)
    .bind(last_modified)
    .bind(content_type)
    .bind(data)
    .bind(keypath::depth(key))
    .bind(keypath::parent(key))
    .execute(&mut **tx)
    .await
    .map(|_| ())
}

async fn insert_tail_chunk(
    tx: &mut SqliteTx<'_>,
    bucket: &str,
    key: &str,
    chunk_index: i64,
    data: &[u8],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO objects \
         (bucket, key, chunk_index, size, etag, last_modified, content_type, data, depth, parent) \
         VALUES (?, ?, ?, 0, '', '', '', ?, NULL, NULL)",
    )
    .bind(bucket)
    .bind(key)
    .bind(chunk_index)
    .bind(data)
    .execute(&mut **tx)
    .await
    .map(|_| ())
}

async fn insert_part_chunks(
    tx: &mut SqliteTx<'_>,
    upload_id: &str,
    part_number: i64,
    etag: &str,
    data: &[u8],
) -> Result<(), sqlx::Error> {
    let head_len = data.len().min(CHUNK_SIZE);
    sqlx::query(
        "INSERT INTO multipart_parts (upload_id, part_number, chunk_index, size, etag, data) \
         VALUES (?, ?, 0, ?, ?, ?)",
    )
    .bind(upload_id)
    .bind(part_number)
    .bind(data.len() as i64)
    .bind(etag)
    .bind(&data[..head_len])
    .execute(&mut **tx)
    .await?;
    let mut chunk_index = 1i64;
    let mut offset = CHUNK_SIZE;
    while offset < data.len() {
        let end = (offset + CHUNK_SIZE).min(data.len());
        sqlx::query(
            "INSERT INTO multipart_parts (upload_id, part_number, chunk_index, size, etag, data) \
             VALUES (?, ?, ?, 0, '', ?)",
        )
        .bind(upload_id)
        .bind(part_number)
        .bind(chunk_index)
        .bind(&data[offset..end])
        .execute(&mut **tx)
        .await?;
        chunk_index += 1;
        offset = end;
    }
    Ok(())
}
