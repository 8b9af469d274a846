use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct HealthResponse {
    /// Always `ok` while the process is serving
    #[schema(example = "ok")]
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }
}
