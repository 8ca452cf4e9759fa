//! HTTP Basic Authentication for the admin surface.
//!
//! The admin capability is a server-verified credential enforced at the
//! data-write boundary; there is no client-side admin flag anywhere.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response, StatusCode},
    middleware::Next,
};
use std::sync::Arc;

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Username for the admin API (None = auth disabled)
    pub username: Option<String>,
    /// Password for the admin API
    pub password: Option<String>,
}

impl AuthConfig {
    /// Load auth config from environment variables.
    /// ADMIN_USERNAME and ADMIN_PASSWORD must both be set to enable auth.
    pub fn from_env() -> Self {
        let username = std::env::var("ADMIN_USERNAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let password = std::env::var("ADMIN_PASSWORD")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Both must be set to enable auth
        if username.is_some() && password.is_some() {
            tracing::info!("Admin authentication enabled");
            Self { username, password }
        } else {
            if username.is_some() || password.is_some() {
                tracing::warn!(
                    "ADMIN_USERNAME and ADMIN_PASSWORD must both be set to enable authentication"
                );
            }
            tracing::warn!("Admin authentication DISABLED - anyone can grade and edit entries!");
            Self {
                username: None,
                password: None,
            }
        }
    }

    /// Check if authentication is enabled
    pub fn is_enabled(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Validate credentials
    pub fn validate(&self, username: &str, password: &str) -> bool {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => {
                // Use constant-time comparison to prevent timing attacks
                constant_time_eq(u.as_bytes(), username.as_bytes())
                    && constant_time_eq(p.as_bytes(), password.as_bytes())
            }
            _ => true, // Auth disabled, allow all
        }
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

/// Middleware for HTTP Basic Authentication on admin routes
pub async fn admin_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    // If auth is disabled, pass through
    if !auth_config.is_enabled() {
        return next.run(request).await;
    }

    // Check Authorization header
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(credentials) = auth_str.strip_prefix("Basic ") {
                if let Ok(decoded) = base64_decode(credentials) {
                    if let Ok(decoded_str) = String::from_utf8(decoded) {
                        if let Some((username, password)) = decoded_str.split_once(':') {
                            if auth_config.validate(username, password) {
                                return next.run(request).await;
                            }
                        }
                    }
                }
            }
        }
    }

    // Return 401 Unauthorized with WWW-Authenticate header
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header(header::WWW_AUTHENTICATE, "Basic realm=\"Propboard Admin\"")
        .body(Body::from("Unauthorized"))
        .unwrap()
}

/// Simple base64 decoder (avoiding additional dependencies)
fn base64_decode(input: &str) -> Result<Vec<u8>, ()> {
    const DECODE_TABLE: [i8; 128] = [
        -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
        -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 62, -1, -1,
        -1, 63, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, -1, -1, -1, -1, -1, -1, -1, 0, 1, 2, 3, 4,
        5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, -1, -1, -1,
        -1, -1, -1, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45,
        46, 47, 48, 49, 50, 51, -1, -1, -1, -1, -1,
    ];

    let input = input.trim_end_matches('=');
    let mut output = Vec::with_capacity(input.len() * 3 / 4);
    let mut buffer = 0u32;
    let mut bits = 0;

    for c in input.chars() {
        let c = c as usize;
        if c >= 128 {
            return Err(());
        }
        let value = DECODE_TABLE[c];
        if value < 0 {
            return Err(());
        }
        buffer = (buffer << 6) | (value as u32);
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            output.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    Ok(output)
}
