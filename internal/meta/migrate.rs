use crate::meta::keypath;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

/// Published migrations are immutable; schema changes append new entries.
struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 0,
        statements: &[
            "CREATE TABLE objects (\
             bucket TEXT NOT NULL, \
             key TEXT NOT NULL, \
             chunk_index INTEGER NOT NULL, \
             size INTEGER NOT NULL DEFAULT 0, \
             etag TEXT NOT NULL DEFAULT '', \
             last_modified TEXT NOT NULL DEFAULT '', \
             content_type TEXT NOT NULL DEFAULT '', \
             data BLOB NOT NULL, \
             PRIMARY KEY (bucket, key, chunk_index))",
            "CREATE TABLE multipart_uploads (\
             upload_id TEXT PRIMARY KEY, \
             bucket TEXT NOT NULL, \
             key TEXT NOT NULL, \
             created_at TEXT NOT NULL, \
             content_type TEXT NOT NULL DEFAULT '')",
            "CREATE TABLE multipart_parts (\
             upload_id TEXT NOT NULL, \
             part_number INTEGER NOT NULL, \
             chunk_index INTEGER NOT NULL, \
             size INTEGER NOT NULL DEFAULT 0, \
             etag TEXT NOT NULL DEFAULT '', \
             data BLOB NOT NULL, \
             PRIMARY KEY (upload_id, part_number, chunk_index))",
            "CREATE INDEX objects_listing_idx ON objects (bucket, key) WHERE chunk_index = 0",
        ],
    },
    Migration {
        version: 1,
        statements: &[
            "ALTER TABLE objects ADD COLUMN depth INTEGER",
            "ALTER TABLE objects ADD COLUMN parent TEXT",
            "CREATE INDEX objects_parent_idx ON objects (bucket, parent) WHERE chunk_index = 0",
        ],
    },
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    run_migrations_through(pool, i64::MAX).await
}

/// Applies every migration with `version <= max_version` that has not been
/// applied yet. Exposed separately so tests can stage a store mid-history.
pub(crate) async fn run_migrations_through(
    pool: &SqlitePool,
    max_version: i64,
) -> Result<(), sqlx::Error> {
    ensure_version_table(pool).await?;
    let applied = max_applied_version(pool).await?;
    for migration in MIGRATIONS {
        if migration.version <= applied || migration.version > max_version {
            continue;
        }
        apply_migration(pool, migration).await?;
        tracing::info!(version = migration.version, "applied store migration");
    }
    Ok(())
}

async fn ensure_version_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
        .execute(pool)
        .await
        .map(|_| ())
}

async fn max_applied_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COALESCE(MAX(version), -1) AS version FROM _migrations")
        .fetch_one(pool)
        .await?;
    row.try_get("version")
}

async fn apply_migration(pool: &SqlitePool, migration: &Migration) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in migration.statements {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    run_post_steps(&mut tx, migration.version).await?;
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(migration.version)
        .execute(&mut *tx)
        .await?;
    tx.commit().await
}

async fn run_post_steps(
    tx: &mut Transaction<'_, Sqlite>,
    version: i64,
) -> Result<(), sqlx::Error> {
    if version == 1 {
        backfill_key_columns(tx).await?;
    }
    Ok(())
}

async fn backfill_key_columns(tx: &mut Transaction<'_, Sqlite>) -> Result<(), sqlx::Error> {
    let keys: Vec<(String, String)> =
        sqlx::query_as("SELECT bucket, key FROM objects WHERE chunk_index = 0")
            .fetch_all(&mut **tx)
            .await?;
    for (bucket, key) in keys {
        sqlx::query(
            "UPDATE objects SET depth = ?, parent = ? \
             WHERE bucket = ? AND key = ? AND chunk_index = 0",
        )
        .bind(keypath::depth(&key))
        .bind(keypath::parent(&key))
        .bind(&bucket)
        .bind(&key)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
