//! API key authentication for the render endpoint.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::{AppState, errors::Error};

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor that succeeds only when the request carries the configured API key.
#[derive(Debug, Clone, Copy)]
pub struct ApiKeyAuth;

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let provided = parts.headers.get(API_KEY_HEADER).map(|value| value.as_bytes());

        match (provided, state.config.api_key.as_deref()) {
            (Some(provided), Some(expected)) if !provided.is_empty() && constant_time_eq(provided, expected.as_bytes()) => {
                Ok(ApiKeyAuth)
            }
            (None, _) => {
                debug!("Request without {} header", API_KEY_HEADER);
                Err(Error::Unauthenticated)
            }
            _ => Err(Error::Unauthenticated),
        }
    }
}

/// Constant-time byte comparison to prevent timing attacks.
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
