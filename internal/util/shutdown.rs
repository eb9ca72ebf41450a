use crate::events::ActivityHub;

/// Resolves once SIGINT or SIGTERM arrives, then reports how many activity
/// observers the shutdown is about to cut off.
pub async fn shutdown_signal(activity: &ActivityHub) {
    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => tracing::info!("interrupt received"),
        _ = terminate => tracing::info!("terminate received"),
    }

    let observers = activity.subscriber_count().await;
    if observers > 0 {
        tracing::info!(observers, "shutting down with activity observers connected");
    }
}
