use tenos_core::api;
use tenos_core::meta::{db, migrate};
use tenos_core::obs::Metrics;
use tenos_core::util::config::Config;
use tenos_core::util::shutdown::shutdown_signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load()?;

    let pool = db::open(&config.db_path).await?;
    migrate::run_migrations(&pool).await?;

    if is_migrate_only() {
        tracing::info!("migrations completed");
        return Ok(());
    }

    let metrics = Metrics::new();
    let state = api::AppState::new(config, pool, metrics)?;
    let activity = state.activity.clone();
    let servers = api::build_servers(state)?;
    tracing::info!("tenant object store serving");

    tokio::select! {
        _ = servers.run_all() => {},
        _ = shutdown_signal(&activity) => {},
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

fn is_migrate_only() -> bool {
    std::env::args().any(|arg| arg == "--migrate-only")
}
