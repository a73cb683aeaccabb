//! Shared-secret authentication for operator actions

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response, StatusCode},
    middleware::Next,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Operator secret (None = auth disabled)
    pub secret: Option<String>,
}

impl AuthConfig {
    /// Load the operator secret from OPERATOR_SECRET, falling back to ADMIN_PASSWORD
    pub fn from_env() -> Self {
        let secret = ["OPERATOR_SECRET", "ADMIN_PASSWORD"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty());

        if secret.is_some() {
            tracing::info!("Operator authentication enabled");
        } else {
            tracing::warn!(
                "Operator authentication DISABLED - anyone can run the game! Set OPERATOR_SECRET."
            );
        }
        Self { secret }
    }

    pub fn disabled() -> Self {
        Self { secret: None }
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Check a presented credential
    pub fn validate(&self, presented: &str) -> bool {
        match &self.secret {
            Some(secret) => constant_time_eq(secret.as_bytes(), presented.as_bytes()),
            None => true, // Auth disabled, allow all
        }
    }

    /// Check an `Authorization` header value (Bearer, or Basic with the secret as password)
    pub fn validate_header(&self, value: &str) -> bool {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return self.validate(token.trim());
        }
        if let Some(credentials) = value.strip_prefix("Basic ") {
            let Ok(decoded) = STANDARD.decode(credentials.trim()) else {
                return false;
            };
            let Ok(decoded) = String::from_utf8(decoded) else {
                return false;
            };
            return decoded
                .split_once(':')
                .is_some_and(|(_, password)| self.validate(password));
        }
        false
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Middleware guarding the operator HTTP endpoints
pub async fn operator_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if !auth_config.is_enabled() {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| auth_config.validate_header(value));
    if authorized {
        return next.run(request).await;
    }

    tracing::warn!(uri = %request.uri(), "Rejected operator request without valid credential");
    let mut response = Response::new(Body::from(
        r#"{"success":false,"code":"UNAUTHORIZED","message":"Operator credential required"}"#,
    ));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        header::HeaderValue::from_static("Bearer realm=\"termbingo operator\""),
    );
    response
}
