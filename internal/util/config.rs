use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub db_path: String,
    pub s3_listen: String,
    pub metrics_listen: String,
    pub auth_secrets: Vec<String>,
    pub allow_dev_token: bool,
    pub body_limit_bytes: usize,
    pub cors_allow_origins: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, String> {
        let db_path = require_env("TENOS_DB_PATH")?;
        let auth_secrets = load_auth_secrets()?;
        Ok(Self {
            db_path,
            s3_listen: env_or("TENOS_S3_LISTEN", "0.0.0.0:9000"),
            metrics_listen: env_or("TENOS_METRICS_LISTEN", "0.0.0.0:9464"),
            auth_secrets,
            allow_dev_token: env_bool("TENOS_ALLOW_DEV_TOKEN"),
            body_limit_bytes: env_usize("TENOS_BODY_LIMIT_BYTES", 128 * 1024 * 1024),
            cors_allow_origins: env_list("TENOS_CORS_ALLOW_ORIGINS"),
        })
    }
}

fn require_env(key: &str) -> Result<String, String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(format!("{key} must be set")),
    }
}

fn load_auth_secrets() -> Result<Vec<String>, String> {
    let secrets = env_list("TENOS_AUTH_SECRETS");
    if secrets.is_empty() && !env_bool("TENOS_ALLOW_DEV_TOKEN") {
        return Err("TENOS_AUTH_SECRETS must have at least one entry".into());
    }
    Ok(secrets)
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_bool(key: &str) -> bool {
    env::var(key)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            )
        })
        .unwrap_or(false)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}
