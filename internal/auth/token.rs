use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Development bypass token; only honored when the store was configured
/// with `allow_dev_token`.
pub const DEV_TOKEN: &str = "foo";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub bucket: String,
    pub exp: usize,
}

/// Pulls the bearer token out of an `Authorization` header.
///
/// Standard AWS SDK clients sign requests with `AWS4-HMAC-SHA256`; the
/// token rides in the `Credential=` slot (its first `/`-delimited
/// component) and the signature bytes after it are ignored.
pub fn extract_token(header: &str) -> Option<&str> {
    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        return (!token.is_empty()).then_some(token);
    }
    if header.starts_with("AWS4-HMAC-SHA256") {
        let credential = header.split("Credential=").nth(1)?;
        let token = credential.split(['/', ',']).next()?;
        return (!token.is_empty()).then_some(token);
    }
    None
}

#[derive(Clone)]
pub struct TokenVerifier {
    keys: Vec<DecodingKey>,
    allow_dev_token: bool,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("keys", &self.keys.len())
            .field("allow_dev_token", &self.allow_dev_token)
            .finish()
    }
}

impl TokenVerifier {
    /// Every secret in the list is accepted, so signing keys can rotate
    /// without invalidating tokens minted under the previous secret.
    pub fn new(secrets: &[String], allow_dev_token: bool) -> Self {
        Self {
            keys: secrets
                .iter()
                .map(|secret| DecodingKey::from_secret(secret.as_bytes()))
                .collect(),
            allow_dev_token,
        }
    }

    pub fn is_dev_token(&self, token: &str) -> bool {
        self.allow_dev_token && token == DEV_TOKEN
    }

    pub fn verify(&self, token: &str) -> Result<Claims, String> {
        payload_subject(token).ok_or_else(|| "token malformed".to_string())?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        for key in &self.keys {
            if let Ok(data) = decode::<Claims>(token, key, &validation) {
                return Ok(data.claims);
            }
        }
        Err("token verification failed".to_string())
    }
}

/// The `sub` claim read straight out of the token's middle segment, before
/// any signature check; its absence is rejected independently of the
/// configured secrets.
fn payload_subject(token: &str) -> Option<String> {
    let mut segments = token.split('.');
    let (_header, payload) = (segments.next()?, segments.next()?);
    segments.next()?;
    if segments.next().is_some() {
        return None;
    }
    let decoded = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    value
        .get("sub")
        .and_then(|sub| sub.as_str())
        .map(ToString::to_string)
}
