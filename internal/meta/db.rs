use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::time::Duration;

/// Opens the embedded store backing one tenant.
///
/// The pool holds exactly one connection and never recycles it: all
/// statements against a tenant serialize on that connection, which is what
/// makes delete-then-insert replacement appear atomic to concurrent
/// requests. Pass `:memory:` for an ephemeral store.
pub async fn open(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}
