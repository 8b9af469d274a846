use crate::dimensions::DocumentError;
use crate::fetch::FetchError;
use crate::rasterize::RasterizeError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

/// Message returned for every system fault. Details stay in the server logs.
pub const GENERIC_RENDER_FAILURE: &str = "Failed to render SVG.";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Missing or incorrect API key
    #[error("Unauthorized")]
    Unauthenticated,

    /// Malformed request body or URL
    #[error("{message}")]
    BadRequest { message: String },

    /// The source document could not be downloaded within the configured limits
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The source document is not parseable XML
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The rasterizer rejected the document
    #[error(transparent)]
    Rasterize(#[from] RasterizeError),

    /// Object store fault during upload or signing
    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } | Error::Fetch(_) | Error::Document(_) => StatusCode::BAD_REQUEST,
            Error::Rasterize(_) | Error::Storage(_) | Error::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the failure is attributable to the caller's input rather than to this service
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated | Error::BadRequest { .. } | Error::Fetch(_) | Error::Document(_) => self.to_string(),
            Error::Rasterize(_) | Error::Storage(_) | Error::Internal { .. } => GENERIC_RENDER_FAILURE.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Unauthenticated => tracing::info!("Authorization error: {}", self),
            Error::BadRequest { .. } | Error::Fetch(_) | Error::Document(_) => {
                tracing::warn!("Client error: {}", self);
            }
            Error::Rasterize(_) | Error::Storage(_) | Error::Internal { .. } => {
                tracing::error!("Rendering failed: {:#}", self);
            }
        }

        let body = ErrorResponse {
            error: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_keep_their_message() {
        let err = Error::from(FetchError::Empty);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "SVG document is empty.");

        let err = Error::BadRequest {
            message: "svg_url must be a valid HTTP(S) URL.".to_string(),
        };
        assert!(err.is_client_error());
        assert_eq!(err.user_message(), "svg_url must be a valid HTTP(S) URL.");
    }

    #[test]
    fn test_system_faults_are_opaque() {
        let err = Error::Storage(anyhow::anyhow!("bucket svg-render-service: access denied for key AKIA..."));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), GENERIC_RENDER_FAILURE);
        assert!(!err.is_client_error());

        let err = Error::from(RasterizeError::Parse("unexpected end of stream".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), GENERIC_RENDER_FAILURE);

        let err = Error::Internal {
            operation: "join rasterizer task: task panicked".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), GENERIC_RENDER_FAILURE);
    }

    #[test]
    fn test_unauthenticated_maps_to_401() {
        assert_eq!(Error::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::Unauthenticated.user_message(), "Unauthorized");
    }
}
