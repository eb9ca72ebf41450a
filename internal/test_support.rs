use crate::api::AppState;
use crate::auth::token::Claims;
use crate::meta::{db, migrate};
use crate::obs::Metrics;
use crate::util::config::Config;
use jsonwebtoken::{encode, EncodingKey, Header};

pub const TEST_SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        db_path: ":memory:".to_string(),
        s3_listen: "127.0.0.1:0".to_string(),
        metrics_listen: "127.0.0.1:0".to_string(),
        auth_secrets: vec![TEST_SECRET.to_string()],
        allow_dev_token: true,
        body_limit_bytes: 16 * 1024 * 1024,
        cors_allow_origins: Vec::new(),
    }
}

pub async fn setup_state() -> AppState {
    setup_state_with(test_config()).await
}

pub async fn setup_state_with(config: Config) -> AppState {
    let pool = db::open(&config.db_path).await.expect("open store");
    migrate::run_migrations(&pool).await.expect("run migrations");
    AppState::new(config, pool, Metrics::new()).expect("app state")
}

pub fn mint_token(bucket: &str, exp_offset_secs: i64) -> String {
    let claims = Claims {
        sub: "tester".to_string(),
        bucket: bucket.to_string(),
        exp: (chrono::Utc::now().timestamp() + exp_offset_secs) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("encode token")
}
