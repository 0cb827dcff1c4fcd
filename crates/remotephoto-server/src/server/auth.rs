//! HTTP Basic authentication for the master pages

use crate::config::AuthConfig;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use subtle::ConstantTimeEq;
use tracing::debug;

const BASIC_PREFIX: &str = "Basic ";

/// Process-wide master credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    username: Vec<u8>,
    password: Vec<u8>,
    realm: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str, realm: &str) -> Self {
        Self {
            username: username.as_bytes().to_vec(),
            password: password.as_bytes().to_vec(),
            realm: realm.to_string(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.username, &config.password, &config.realm)
    }

    /// Check an `Authorization` header value. Missing, malformed and
    /// mismatching headers are all rejected.
    pub fn verify(&self, header: Option<&HeaderValue>) -> bool {
        let Some(encoded) = header
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix(BASIC_PREFIX))
        else {
            return false;
        };

        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };

        let Some(split) = decoded.iter().position(|b| *b == b':') else {
            return false;
        };
        let (user, pass) = (&decoded[..split], &decoded[split + 1..]);

        let user_ok = user.ct_eq(self.username.as_slice());
        let pass_ok = pass.ct_eq(self.password.as_slice());
        (user_ok & pass_ok).into()
    }

    /// 401 response asking the browser for credentials
    pub fn challenge(&self) -> Response {
        let value = format!("Basic realm=\"{}\"", self.realm);
        let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized\n").into_response();
        if let Ok(value) = HeaderValue::from_str(&value) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

/// Middleware guarding the master routes
pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state
        .credentials
        .verify(request.headers().get(header::AUTHORIZATION))
    {
        return next.run(request).await;
    }

    debug!(
        "Rejected unauthenticated {} {}",
        request.method(),
        request.uri().path()
    );
    state.credentials.challenge()
}
