//! Route handlers.
//!
//! - [`health`]: liveness probe
//! - [`render`]: fetch, rasterize and upload an SVG
//!
//! Handlers return [`crate::errors::Error`], which converts to a status code and a JSON
//! `{"error": ...}` body.

pub mod health;
pub mod render;
