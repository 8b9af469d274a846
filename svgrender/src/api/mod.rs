//! HTTP surface of the service.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response bodies
//!
//! `POST /render` requires the `X-API-Key` header; `GET /healthz` is open. Both are documented
//! with `utoipa` and served as OpenAPI at `/api-docs/openapi.json`, browsable at `/docs`.

pub mod handlers;
pub mod models;
