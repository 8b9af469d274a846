//! Bodies of `POST /render`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dimensions::TargetSize;
use crate::render::RenderOutcome;

/// Render request. `svg_url` may be missing or of any JSON type here; the handler validates it.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RenderRequest {
    /// Absolute `http` or `https` URL of the SVG document to render
    #[schema(value_type = String, example = "https://example.com/logo.svg")]
    #[serde(default)]
    pub svg_url: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct RenderResponse {
    /// Time-limited link to the rendered PNG
    pub png_url: String,
    /// Key of the PNG in the bucket
    #[schema(example = "renders/3f2b9c0e8d7a4b6f9e1d2c3b4a5f6e7d.png")]
    pub object_name: String,
    pub dimensions: TargetSize,
    /// Stale renders deleted while handling this request
    pub pruned_files: u64,
}

impl From<RenderOutcome> for RenderResponse {
    fn from(outcome: RenderOutcome) -> Self {
        Self {
            png_url: outcome.png_url,
            object_name: outcome.object_name,
            dimensions: outcome.dimensions,
            pruned_files: outcome.pruned_files,
        }
    }
}
