use crate::auth::token::TokenVerifier;
use crate::events::ActivityHub;
use crate::meta::repos::Repo;
use crate::obs::Metrics;
use crate::s3;
use crate::util::config::Config;
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, TextEncoder};
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub repo: Repo,
    pub metrics: Arc<Metrics>,
    pub verifier: TokenVerifier,
    pub activity: ActivityHub,
}

impl AppState {
    pub fn new(config: Config, pool: SqlitePool, metrics: Arc<Metrics>) -> Result<Self, String> {
        if config.auth_secrets.is_empty() && !config.allow_dev_token {
            return Err("TENOS_AUTH_SECRETS must have at least one entry".into());
        }
        let verifier = TokenVerifier::new(&config.auth_secrets, config.allow_dev_token);
        Ok(Self {
            config,
            repo: Repo::new(pool),
            metrics,
            verifier,
            activity: ActivityHub::new(),
        })
    }
}

#[derive(Debug)]
pub struct Servers {
    handles: Vec<JoinHandle<()>>,
}

impl Servers {
    pub async fn run_all(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

pub fn build_servers(state: AppState) -> Result<Servers, String> {
    let mut handles = Vec::new();

    let s3_app = s3::router(state.clone());
    handles.push(spawn_server(&state.config.s3_listen, s3_app)?);

    let metrics_app = metrics_router(state.clone());
    handles.push(spawn_server(&state.config.metrics_listen, metrics_app)?);

    Ok(Servers { handles })
}

fn spawn_server(addr: &str, app: Router) -> Result<JoinHandle<()>, String> {
    let socket: SocketAddr = addr
        .parse()
        .map_err(|_| format!("invalid listen addr {addr}"))?;
    let handle = tokio::spawn(async move {
        let listener = match TcpListener::bind(socket).await {
            Ok(val) => val,
            Err(err) => {
                tracing::error!(%socket, error = %err, "listener bind failed");
                return;
            }
        };
        let _ = axum::serve(listener, app).await;
    });
    Ok(handle)
}

fn metrics_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    let _ = encoder.encode(&state.metrics.gather(), &mut buffer);
    String::from_utf8_lossy(&buffer).to_string()
}

#[cfg(test)]
mod tests {
    use super::{build_servers, metrics_router};
    use crate::test_support;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn app_state_requires_secrets_or_dev_token() {
        let pool = crate::meta::db::open(":memory:").await.expect("open");
        let mut config = test_support::test_config();
        config.auth_secrets.clear();
        config.allow_dev_token = false;
        let err = super::AppState::new(config, pool, crate::obs::Metrics::new()).unwrap_err();
        assert!(err.contains("TENOS_AUTH_SECRETS"));
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_counters() {
        let state = test_support::setup_state().await;
        state
            .metrics
            .s3_requests
            .with_label_values(&["PutObject", "200"])
            .inc();
        let app = metrics_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(text.contains("tenos_s3_requests_total"));
    }

    #[tokio::test]
    async fn healthz_responds_ok() {
        let state = test_support::setup_state().await;
        let app = metrics_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn build_servers_rejects_invalid_listen_addr() {
        let mut state = test_support::setup_state().await;
        state.config.s3_listen = "not-an-addr".to_string();
        let err = build_servers(state).unwrap_err();
        assert!(err.contains("invalid listen addr"));
    }

    #[tokio::test]
    async fn build_servers_accepts_ephemeral_ports() {
        let mut state = test_support::setup_state().await;
        state.config.s3_listen = "127.0.0.1:0".to_string();
        state.config.metrics_listen = "127.0.0.1:0".to_string();
        let servers = build_servers(state).expect("servers");
        drop(servers);
    }
}
